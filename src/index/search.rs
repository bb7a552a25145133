//! Retrieval queries over the index: vector similarity in embedding mode,
//! title/keyword composite scoring in lexical mode.

use rusqlite::Result;

use super::{Index, serialize_vector};
use crate::config::RetrievalConfig;
use crate::text;

/// A ranked retrieval candidate.
#[derive(Debug, Clone)]
pub struct Retrieved {
    pub source: String,
    pub title: Option<String>,
    pub content: String,
    pub position: usize,
    /// Descending relevance: cosine similarity in vector mode, composite
    /// score in lexical mode.
    pub score: f64,
}

impl Index {
    /// Nearest-neighbor search by cosine distance over the embedded sections.
    ///
    /// Returns an empty list when the index has no entries.
    pub fn search_vector(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<Retrieved>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                d.source,
                s.title,
                s.content,
                s.position,
                vec_distance_cosine(v.embedding, ?) AS distance
            FROM vec_sections v
            JOIN sections s ON v.rowid = s.id
            JOIN documents d ON s.document_id = d.id
            ORDER BY distance ASC
            LIMIT ?
            "#,
        )?;

        let rows = stmt.query_map(
            rusqlite::params![serialize_vector(query_vector), top_k as i64],
            |row| {
                let distance: f64 = row.get(4)?;
                Ok(Retrieved {
                    source: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get(2)?,
                    position: row.get::<_, i64>(3)? as usize,
                    score: 1.0 - (distance / 2.0),
                })
            },
        )?;

        rows.collect()
    }

    /// Lexical retrieval: rank sections by title match and keyword overlap.
    ///
    /// A section whose normalized title is included in the normalized query
    /// (or vice versa) is a direct match and ranks first. Otherwise the score
    /// is `title_similarity + keyword_weight × overlap`. Returns no candidate
    /// at all when even the best section has both a weak title similarity and
    /// a low keyword overlap — near-misses are left for the relevance gate to
    /// judge, clear misses are cut here.
    pub fn search_lexical(
        &self,
        question: &str,
        top_k: usize,
        params: &RetrievalConfig,
    ) -> Result<Vec<Retrieved>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT d.source, s.title, s.content, s.position
            FROM sections s
            JOIN documents d ON s.document_id = d.id
            ORDER BY d.source, s.position
            "#,
        )?;

        let rows: Vec<(String, Option<String>, String, usize)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get::<_, i64>(3)? as usize,
                ))
            })?
            .collect::<Result<_>>()?;

        let norm_q = text::normalize(question);
        // Overlap counting uses a lower length floor than the gate: two-letter
        // acronyms like "ip" still count here.
        let q_keywords = text::keywords(question, 2);

        let mut scored: Vec<(bool, f64, usize, Retrieved)> = Vec::with_capacity(rows.len());

        for (source, title, content, position) in rows {
            let norm_title = title.as_deref().map(text::normalize).unwrap_or_default();

            let direct = !norm_title.is_empty()
                && (norm_q.contains(&norm_title) || norm_title.contains(&norm_q));

            let title_sim = if norm_title.is_empty() {
                0.0
            } else {
                text::similarity_ratio(&norm_q, &norm_title)
            };

            let haystack = match &title {
                Some(t) => format!("{t} {content}"),
                None => content.clone(),
            };
            let overlap = text::keywords(&haystack, 2)
                .intersection(&q_keywords)
                .count();

            let score = if direct {
                // Well above any composite score, still ordered by overlap.
                10.0 + overlap as f64
            } else {
                title_sim + params.keyword_weight * overlap as f64
            };

            scored.push((
                direct,
                title_sim,
                overlap,
                Retrieved {
                    source,
                    title,
                    content,
                    position,
                    score,
                },
            ));
        }

        scored.sort_by(|a, b| {
            b.3.score
                .partial_cmp(&a.3.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        match scored.first() {
            None => return Ok(Vec::new()),
            Some(&(direct, title_sim, overlap, _)) => {
                if !direct
                    && title_sim < params.min_title_similarity
                    && overlap < params.min_keyword_overlap
                {
                    return Ok(Vec::new());
                }
            }
        }

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, _, _, r)| r)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Section;

    fn lexical_index() -> Index {
        let mut index = Index::open_in_memory(4).unwrap();
        let sections = vec![
            Section {
                content: "The OSI reference model organizes networking in seven layers."
                    .to_string(),
                source: "notes/networking.md".to_string(),
                title: Some("The OSI model".to_string()),
                position: 0,
            },
            Section {
                content: "HTTP is an application protocol. The HTTP default port is 80."
                    .to_string(),
                source: "notes/networking.md".to_string(),
                title: Some("HTTP basics".to_string()),
                position: 1,
            },
            Section {
                content: "Paris is the capital of France.".to_string(),
                source: "notes/geography.md".to_string(),
                title: Some("Capitals".to_string()),
                position: 0,
            },
        ];
        index.populate(&sections, None).unwrap();
        index
    }

    #[test]
    fn test_lexical_direct_title_match_first() {
        let index = lexical_index();
        let params = RetrievalConfig::default();
        let results = index
            .search_lexical("What are the layers of the OSI model?", 3, &params)
            .unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].title.as_deref(), Some("The OSI model"));
    }

    #[test]
    fn test_lexical_keyword_overlap_fallback() {
        let index = lexical_index();
        let params = RetrievalConfig::default();
        let results = index
            .search_lexical("what is the capital of france", 3, &params)
            .unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].source, "notes/geography.md");
    }

    #[test]
    fn test_lexical_rejects_unrelated_query() {
        let index = lexical_index();
        let params = RetrievalConfig::default();
        let results = index
            .search_lexical("quantum chromodynamics lagrangian", 3, &params)
            .unwrap();
        assert!(results.is_empty(), "expected no candidate, got {results:?}");
    }

    #[test]
    fn test_lexical_empty_index() {
        let index = Index::open_in_memory(4).unwrap();
        let params = RetrievalConfig::default();
        let results = index.search_lexical("anything at all", 3, &params).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_vector_search_ranks_by_similarity() {
        let mut index = Index::open_in_memory(4).unwrap();
        let sections = vec![
            Section {
                content: "near".to_string(),
                source: "a.md".to_string(),
                title: None,
                position: 0,
            },
            Section {
                content: "far".to_string(),
                source: "b.md".to_string(),
                title: None,
                position: 0,
            },
        ];
        let embeddings = vec![vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]];
        index.populate(&sections, Some(&embeddings)).unwrap();

        let results = index.search_vector(&[1.0, 0.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "near");
        assert!(results[0].score > results[1].score);
        assert!(results[0].score > 0.99);
    }

    #[test]
    fn test_vector_search_empty_index() {
        let index = Index::open_in_memory(4).unwrap();
        let results = index.search_vector(&[1.0, 0.0, 0.0, 0.0], 5).unwrap();
        assert!(results.is_empty());
    }
}
