use crate::config::WRITE_BUFFER_SIZE;
use crate::models::Page;
use crate::pipeline::Extraction;
use anyhow::{Context, Result};
use csv::Writer;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// A node per page title, with outgoing links and category memberships.
///
/// Link targets are taken at face value; a target with no page of its own
/// still becomes a node so edges always have both ends.
#[derive(Debug, Default)]
pub struct LinkGraph {
    index: FxHashMap<String, usize>,
    nodes: Vec<Node>,
}

#[derive(Debug)]
pub struct Node {
    pub title: String,
    /// True if the dump contained a page with this title.
    pub has_page: bool,
    pub links: Vec<usize>,
    pub categories: Vec<String>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains a running extraction into a graph.
    pub async fn from_extraction(mut extraction: Extraction) -> Result<Self> {
        let mut graph = Self::new();
        while let Some(page) = extraction.recv().await {
            graph.add_page(page);
        }
        extraction.finish().await?;
        Ok(graph)
    }

    fn node_id(&mut self, title: &str) -> usize {
        if let Some(&id) = self.index.get(title) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(Node {
            title: title.to_string(),
            has_page: false,
            links: Vec::new(),
            categories: Vec::new(),
        });
        self.index.insert(title.to_string(), id);
        id
    }

    pub fn add_page(&mut self, page: Page) {
        let id = self.node_id(&page.title);
        let targets: Vec<usize> = page.links.iter().map(|l| self.node_id(l)).collect();

        let node = &mut self.nodes[id];
        node.has_page = true;
        node.links.extend(targets);
        node.categories.extend(page.categories);
    }

    pub fn node(&self, title: &str) -> Option<&Node> {
        self.index.get(title).map(|&id| &self.nodes[id])
    }

    /// Titles linked from `title`, in order of appearance.
    pub fn neighbors(&self, title: &str) -> Vec<&str> {
        self.node(title)
            .map(|n| {
                n.links
                    .iter()
                    .map(|&id| self.nodes[id].title.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.links.len()).sum()
    }

    /// Writes `nodes.csv`, `edges.csv` and, if any page has categories,
    /// `article_categories.csv` into `output_dir`.
    pub fn write_csv(&self, output_dir: impl AsRef<Path>) -> Result<()> {
        let dir = output_dir.as_ref();

        let mut nodes_writer = csv_writer(dir, "nodes.csv")?;
        nodes_writer.write_record(["title:ID", ":LABEL"])?;
        for node in &self.nodes {
            let label = if node.has_page { "Page" } else { "Missing" };
            nodes_writer.write_record([node.title.as_str(), label])?;
        }
        nodes_writer.flush()?;

        let mut edges_writer = csv_writer(dir, "edges.csv")?;
        edges_writer.write_record([":START_ID", ":END_ID", ":TYPE"])?;
        for node in &self.nodes {
            for &target in &node.links {
                edges_writer.write_record([
                    node.title.as_str(),
                    self.nodes[target].title.as_str(),
                    "LINKS_TO",
                ])?;
            }
        }
        edges_writer.flush()?;

        if self.nodes.iter().any(|n| !n.categories.is_empty()) {
            let mut cat_writer = csv_writer(dir, "article_categories.csv")?;
            cat_writer.write_record([":START_ID", ":END_ID(Category)", ":TYPE"])?;
            for node in &self.nodes {
                for category in &node.categories {
                    cat_writer.write_record([
                        node.title.as_str(),
                        category.as_str(),
                        "HAS_CATEGORY",
                    ])?;
                }
            }
            cat_writer.flush()?;
        }

        info!(
            nodes = self.node_count(),
            edges = self.edge_count(),
            dir = %dir.display(),
            "Graph written"
        );
        Ok(())
    }
}

fn csv_writer(dir: &Path, name: &str) -> Result<Writer<BufWriter<File>>> {
    let path = dir.join(name);
    let file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(Writer::from_writer(BufWriter::with_capacity(
        WRITE_BUFFER_SIZE,
        file,
    )))
}
