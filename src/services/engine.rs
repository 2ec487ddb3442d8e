//! Stage 4: the index-and-rewrite engine.
//!
//! Loading parses every XML file of a bundle directory into a [`DocumentSet`].
//! Pass 1 ([`RewriteEngine::build_index`]) scans every document for elements
//! with an identifier and records `id -> (file, title)`. Pass 2
//! ([`RewriteEngine::rewrite_all`]) removes authoring-only elements and turns
//! every cross-reference into either a direct link or an empty marker, using
//! the finished index. Indexing must see the whole set before any rewrite, since
//! a reference in one file may point at an id defined in another.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fs;

use super::files::files_with_extension;
use crate::models::RewriteRules;
use crate::xml::{self, Document, NodeId, NodeKind};

/// Parsed documents keyed by path, in file-name order
pub type DocumentSet = IndexMap<Utf8PathBuf, Document>;

/// Where an identifier lives and what to call a link to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub filename: String,
    pub title: String,
}

/// Immutable corpus-wide identifier table produced by pass 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierIndex {
    entries: HashMap<String, IndexEntry>,
}

impl IdentifierIndex {
    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Diagnostics from pass 2
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Removed elements per tag name
    pub removed: IndexMap<String, usize>,
    /// Cross-references rewritten, outside links included
    pub rewritten_links: usize,
    /// Cross-references whose target is not in the bundle
    pub outside_links: usize,
    /// Cross-references without a target attribute, left alone
    pub missing_targets: usize,
}

impl RewriteStats {
    pub fn removed_count(&self, tag: &str) -> usize {
        self.removed.get(tag).copied().unwrap_or(0)
    }

    /// Add another document's stats to this one
    pub fn merge(&mut self, other: &RewriteStats) {
        for (tag, count) in &other.removed {
            *self.removed.entry(tag.clone()).or_insert(0) += count;
        }
        self.rewritten_links += other.rewritten_links;
        self.outside_links += other.outside_links;
        self.missing_targets += other.missing_targets;
    }

    /// Get a summary string of what was changed
    pub fn summary(&self) -> String {
        let removed: Vec<String> = self
            .removed
            .iter()
            .map(|(tag, count)| format!("{} {} tags", count, tag))
            .collect();
        let removed = if removed.is_empty() {
            "nothing removed".to_string()
        } else {
            format!("removed {}", removed.join(", "))
        };
        format!(
            "{}; {} links rewritten, {} outside links",
            removed, self.rewritten_links, self.outside_links
        )
    }
}

/// Everything the engine did to one bundle directory
#[derive(Debug, Clone, Default)]
pub struct EngineReport {
    pub documents: Vec<Utf8PathBuf>,
    pub parse_failures: Vec<Utf8PathBuf>,
    pub ids_indexed: usize,
    pub stats: RewriteStats,
}

/// Index-and-rewrite engine configured with element and attribute names.
#[derive(Debug, Clone, Default)]
pub struct RewriteEngine {
    rules: RewriteRules,
}

impl RewriteEngine {
    pub fn new(rules: RewriteRules) -> Self {
        Self { rules }
    }

    /// Parse every `.xml` file of `dir`.
    ///
    /// Files that fail to parse are logged and left out of the set; the second
    /// element of the result lists them.
    pub fn load_documents(&self, dir: &Utf8Path) -> Result<(DocumentSet, Vec<Utf8PathBuf>)> {
        tracing::info!("loading all XML files");
        let mut documents = DocumentSet::new();
        let mut failures = Vec::new();

        for path in files_with_extension(dir, "xml")? {
            tracing::debug!("loading: {}", path);
            let parsed = fs::read(&path)
                .map_err(anyhow::Error::from)
                .and_then(|bytes| xml::parse_bytes(&bytes).map_err(anyhow::Error::from));
            match parsed {
                Ok(doc) => {
                    documents.insert(path, doc);
                }
                Err(e) => {
                    tracing::warn!("parsing {} failed: {:#}", path, e);
                    failures.push(path);
                }
            }
        }

        tracing::info!("{} XML files loaded", documents.len());
        Ok((documents, failures))
    }

    /// Pass 1: collect `id -> (file name, title)` over the whole set.
    ///
    /// A later duplicate id replaces an earlier one.
    pub fn build_index(&self, documents: &DocumentSet) -> IdentifierIndex {
        let mut entries = HashMap::new();

        for (path, doc) in documents {
            let filename = path.file_name().unwrap_or(path.as_str()).to_string();

            for node in doc.descendants(doc.document_node()) {
                let Some(id) = doc.attribute(node, &self.rules.id_attribute) else {
                    continue;
                };
                if id.is_empty() {
                    continue;
                }

                let title_node = doc.child_element(node, &self.rules.title_element);
                if let Some(title_node) = title_node {
                    for name in unresolved_entities(doc, title_node) {
                        tracing::warn!(
                            "title of id {} in {} has unresolved entity &{};, left out of link text",
                            id,
                            filename,
                            name
                        );
                    }
                }
                let title = title_node
                    .map(|title| doc.text_content(title).trim().to_string())
                    .filter(|title| !title.is_empty());

                match title {
                    Some(title) => {
                        let entry = IndexEntry {
                            filename: filename.clone(),
                            title,
                        };
                        if let Some(previous) = entries.insert(id.to_string(), entry) {
                            tracing::debug!(
                                "id {} in {} replaces the one in {}",
                                id,
                                filename,
                                previous.filename
                            );
                        }
                    }
                    None => tracing::warn!("id {} in {} has no title text", id, path),
                }
            }
        }

        tracing::info!("{} ids found", entries.len());
        IdentifierIndex { entries }
    }

    /// Pass 2 on one document: drop removable elements, rewrite cross-references.
    pub fn rewrite_document(
        &self,
        doc: &mut Document,
        index: &IdentifierIndex,
        path: &Utf8Path,
    ) -> RewriteStats {
        let mut stats = RewriteStats::default();

        for tag in &self.rules.removable_elements {
            let matches = doc.elements_named(tag);
            for node in &matches {
                doc.detach(*node);
            }
            *stats.removed.entry(tag.clone()).or_insert(0) += matches.len();
        }

        for xref in doc.elements_named(&self.rules.xref_element) {
            let Some(target) = doc
                .attribute(xref, &self.rules.xref_target_attribute)
                .filter(|target| !target.is_empty())
                .map(str::to_string)
            else {
                tracing::warn!(
                    "{} has a {} link with missing {}",
                    path,
                    self.rules.xref_element,
                    self.rules.xref_target_attribute
                );
                stats.missing_targets += 1;
                continue;
            };

            match index.get(&target) {
                Some(entry) => {
                    let link = doc.create_element(&self.rules.link_element);
                    doc.set_attribute(link, &self.rules.link_address_attribute, &entry.filename);
                    doc.append_text(link, &entry.title);
                    doc.replace(xref, link);
                }
                None => {
                    tracing::info!("outside link, id: {} in {}", target, path);
                    doc.clear(xref);
                    stats.outside_links += 1;
                }
            }
            stats.rewritten_links += 1;
        }

        stats
    }

    /// Pass 2 over the whole set.
    pub fn rewrite_all(&self, documents: &mut DocumentSet, index: &IdentifierIndex) -> RewriteStats {
        tracing::info!("removing authoring-only tags, rewriting links");
        let mut total = RewriteStats::default();
        for tag in &self.rules.removable_elements {
            total.removed.insert(tag.clone(), 0);
        }

        for (path, doc) in documents.iter_mut() {
            let stats = self.rewrite_document(doc, index, path);
            total.merge(&stats);
        }

        let removed: Vec<String> = total
            .removed
            .iter()
            .map(|(tag, count)| format!("{} {}", count, tag))
            .collect();
        tracing::info!("removed: {}", removed.join(", "));
        tracing::info!(
            "{} links have been rewritten, {} were outside links",
            total.rewritten_links,
            total.outside_links
        );
        total
    }

    /// Write every document back to its path.
    pub fn save_documents(&self, documents: &DocumentSet) -> Result<()> {
        tracing::info!("saving modified XMLs to storage");
        for (path, doc) in documents {
            fs::write(path, xml::to_string(doc))
                .with_context(|| format!("Failed to write {}", path))?;
        }
        Ok(())
    }

    /// Load, index, rewrite and save every XML file of `dir`.
    pub fn process_directory(&self, dir: &Utf8Path) -> Result<EngineReport> {
        let (mut documents, parse_failures) = self.load_documents(dir)?;
        let index = self.build_index(&documents);
        let stats = self.rewrite_all(&mut documents, &index);
        self.save_documents(&documents)?;

        Ok(EngineReport {
            documents: documents.keys().cloned().collect(),
            parse_failures,
            ids_indexed: index.len(),
            stats,
        })
    }
}

/// Names of entity references left under `node`.
fn unresolved_entities(doc: &Document, node: NodeId) -> Vec<&str> {
    doc.descendants(node)
        .into_iter()
        .filter_map(|id| match doc.kind(id) {
            NodeKind::EntityRef(name) => Some(name.as_str()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(files: &[(&str, &str)]) -> DocumentSet {
        files
            .iter()
            .map(|(name, content)| (Utf8PathBuf::from(*name), xml::parse(content).unwrap()))
            .collect()
    }

    #[test]
    fn test_unresolved_entity_in_title_is_reported() {
        let engine = RewriteEngine::default();
        let docs = set(&[(
            "A.xml",
            r#"<chapter id="setup"><title>&PRODUCT; Setup</title><para>&IGURL;</para></chapter>"#,
        )]);
        let doc = &docs[0];
        let chapter = doc.root_element().unwrap();
        let title = doc.child_element(chapter, "title").unwrap();

        assert_eq!(unresolved_entities(doc, title), vec!["PRODUCT"]);
        assert_eq!(unresolved_entities(doc, chapter), vec!["PRODUCT", "IGURL"]);
        // the reference is left out of the link text
        assert_eq!(engine.build_index(&docs).get("setup").unwrap().title, "Setup");
    }

    #[test]
    fn test_index_records_filename_and_title() {
        let engine = RewriteEngine::default();
        let docs = set(&[(
            "out/A.xml",
            r#"<chapter id="intro"><title>Introduction</title><section id="s1"><title> Setup </title></section></chapter>"#,
        )]);

        let index = engine.build_index(&docs);

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.get("intro"),
            Some(&IndexEntry {
                filename: "A.xml".into(),
                title: "Introduction".into()
            })
        );
        assert_eq!(index.get("s1").unwrap().title, "Setup");
    }

    #[test]
    fn test_index_skips_ids_without_title_text() {
        let engine = RewriteEngine::default();
        let docs = set(&[(
            "A.xml",
            r#"<chapter><para id="p1">x</para><section id="s2"><title/></section></chapter>"#,
        )]);

        let index = engine.build_index(&docs);
        assert!(index.is_empty());
    }

    #[test]
    fn test_index_title_with_inline_markup() {
        let engine = RewriteEngine::default();
        let docs = set(&[(
            "A.xml",
            r#"<section id="s"><title>Using <application>Kdump</application></title></section>"#,
        )]);

        let index = engine.build_index(&docs);
        assert_eq!(index.get("s").unwrap().title, "Using Kdump");
    }

    #[test]
    fn test_duplicate_id_last_document_wins() {
        let engine = RewriteEngine::default();
        let docs = set(&[
            ("A.xml", r#"<section id="dup"><title>First</title></section>"#),
            ("B.xml", r#"<section id="dup"><title>Second</title></section>"#),
        ]);

        let index = engine.build_index(&docs);
        assert_eq!(index.get("dup").unwrap().filename, "B.xml");
        assert_eq!(index.get("dup").unwrap().title, "Second");
    }

    #[test]
    fn test_indexing_is_idempotent() {
        let engine = RewriteEngine::default();
        let docs = set(&[
            ("A.xml", r#"<chapter id="a"><title>A</title></chapter>"#),
            ("B.xml", r#"<chapter id="b"><title>B</title></chapter>"#),
        ]);

        assert_eq!(engine.build_index(&docs), engine.build_index(&docs));
    }

    #[test]
    fn test_resolved_xref_becomes_link_with_tail() {
        let engine = RewriteEngine::default();
        let mut docs = set(&[
            ("A.xml", r#"<chapter id="intro"><title>Introduction</title></chapter>"#),
            ("B.xml", r#"<para>See <xref linkend="intro"/> for more.</para>"#),
        ]);
        let index = engine.build_index(&docs);

        let stats = engine.rewrite_all(&mut docs, &index);

        let b = &docs[&Utf8PathBuf::from("B.xml")];
        assert_eq!(
            xml::to_string(b),
            r#"<para>See <ulink url="A.xml">Introduction</ulink> for more.</para>"#
        );
        assert_eq!(stats.rewritten_links, 1);
        assert_eq!(stats.outside_links, 0);
    }

    #[test]
    fn test_xref_without_tail_gets_no_tail() {
        let engine = RewriteEngine::default();
        let mut docs = set(&[
            ("A.xml", r#"<chapter id="intro"><title>Introduction</title></chapter>"#),
            ("B.xml", r#"<para>See <xref linkend="intro"/></para>"#),
        ]);
        let index = engine.build_index(&docs);
        engine.rewrite_all(&mut docs, &index);

        let b = &docs[&Utf8PathBuf::from("B.xml")];
        let root = b.root_element().unwrap();
        let link = *b.children(root).last().unwrap();
        assert_eq!(b.name(link), Some("ulink"));
    }

    #[test]
    fn test_outside_xref_becomes_empty_marker() {
        let engine = RewriteEngine::default();
        let mut docs = set(&[(
            "B.xml",
            r#"<para>See <xref linkend="external-only" role="x">old</xref>, then go on.</para>"#,
        )]);
        let index = engine.build_index(&docs);

        let stats = engine.rewrite_all(&mut docs, &index);

        let b = &docs[&Utf8PathBuf::from("B.xml")];
        assert_eq!(xml::to_string(b), "<para>See <xref/>, then go on.</para>");
        assert_eq!(stats.outside_links, 1);
        assert_eq!(stats.rewritten_links, 1);
    }

    #[test]
    fn test_xref_missing_linkend_is_left_alone() {
        let engine = RewriteEngine::default();
        let mut docs = set(&[("B.xml", r#"<para>See <xref endterm="x"/>.</para>"#)]);
        let index = engine.build_index(&docs);

        let stats = engine.rewrite_all(&mut docs, &index);

        let b = &docs[&Utf8PathBuf::from("B.xml")];
        assert_eq!(xml::to_string(b), r#"<para>See <xref endterm="x"/>.</para>"#);
        assert_eq!(stats.missing_targets, 1);
        assert_eq!(stats.rewritten_links, 0);
    }

    #[test]
    fn test_figures_and_remarks_removed_keeping_text_order() {
        let engine = RewriteEngine::default();
        let mut docs = set(&[(
            "A.xml",
            concat!(
                "<section><para>one<remark>todo</remark> two</para>",
                "<figure><title>F</title><figure><title>inner</title></figure></figure>",
                "<para>three</para></section>"
            ),
        )]);
        let index = engine.build_index(&docs);

        let stats = engine.rewrite_all(&mut docs, &index);

        let a = &docs[&Utf8PathBuf::from("A.xml")];
        assert_eq!(
            xml::to_string(a),
            "<section><para>one two</para><para>three</para></section>"
        );
        assert_eq!(stats.removed_count("figure"), 2);
        assert_eq!(stats.removed_count("remark"), 1);
        assert!(a.elements_named("figure").is_empty());
        assert!(a.elements_named("remark").is_empty());
    }

    #[test]
    fn test_xref_inside_removed_figure_is_not_counted() {
        let engine = RewriteEngine::default();
        let mut docs = set(&[(
            "A.xml",
            r#"<section><figure><title>F</title><para><xref linkend="gone"/></para></figure></section>"#,
        )]);
        let index = engine.build_index(&docs);

        let stats = engine.rewrite_all(&mut docs, &index);
        assert_eq!(stats.rewritten_links, 0);
    }

    #[test]
    fn test_link_title_is_escaped_text() {
        let engine = RewriteEngine::default();
        let mut docs = set(&[
            ("A.xml", r#"<section id="q"><title>Q &amp; A</title></section>"#),
            ("B.xml", r#"<para><xref linkend="q"/></para>"#),
        ]);
        let index = engine.build_index(&docs);
        engine.rewrite_all(&mut docs, &index);

        let b = &docs[&Utf8PathBuf::from("B.xml")];
        let root = b.root_element().unwrap();
        let link = b.children(root)[0];
        assert_eq!(b.kind(b.children(link)[0]), &NodeKind::Text("Q & A".into()));
        assert_eq!(xml::to_string(b), r#"<para><ulink url="A.xml">Q &amp; A</ulink></para>"#);
    }

    #[test]
    fn test_custom_rules() {
        let rules = RewriteRules {
            id_attribute: "xml:id".to_string(),
            removable_elements: vec!["note".to_string()],
            link_element: "link".to_string(),
            link_address_attribute: "href".to_string(),
            ..RewriteRules::default()
        };
        let engine = RewriteEngine::new(rules);
        let mut docs = set(&[(
            "A.xml",
            r#"<chapter xml:id="c"><title>Chap</title><note>n</note><para><xref linkend="c"/></para></chapter>"#,
        )]);
        let index = engine.build_index(&docs);
        engine.rewrite_all(&mut docs, &index);

        let a = &docs[&Utf8PathBuf::from("A.xml")];
        assert_eq!(
            xml::to_string(a),
            r#"<chapter xml:id="c"><title>Chap</title><para><link href="A.xml">Chap</link></para></chapter>"#
        );
    }

    #[test]
    fn test_stats_summary() {
        let mut stats = RewriteStats::default();
        stats.removed.insert("figure".into(), 3);
        stats.rewritten_links = 4;
        stats.outside_links = 1;

        let summary = stats.summary();
        assert!(summary.contains("3 figure tags"));
        assert!(summary.contains("4 links rewritten"));
        assert!(summary.contains("1 outside links"));
    }
}
