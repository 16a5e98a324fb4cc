// Running-config block segmentation
//
// A block starts on a top-level line matching its kind's start pattern and
// runs until a `!` line or the next top-level line, which is then checked
// as the start of a new block.

pub mod ospf;

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Interface,
    Router,
}

impl BlockKind {
    fn start_pattern(self) -> &'static str {
        match self {
            BlockKind::Interface => r"^interface\s+\S+",
            BlockKind::Router => r"^router\s+\S+",
        }
    }
}

static END_REGEX: OnceLock<Regex> = OnceLock::new();

fn end_regex() -> &'static Regex {
    END_REGEX.get_or_init(|| Regex::new(r"^(!|end\s*$|\S)").expect("Invalid Regex"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigBlock {
    pub kind: BlockKind,
    pub header: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BlockSegmenter {
    rules: Vec<(BlockKind, Regex)>,
}

impl BlockSegmenter {
    pub fn new(kinds: impl IntoIterator<Item = BlockKind>) -> Self {
        let rules = kinds
            .into_iter()
            .map(|kind| {
                let start = Regex::new(kind.start_pattern()).expect("Invalid Regex");
                (kind, start)
            })
            .collect();
        BlockSegmenter { rules }
    }

    /// Split `config` into blocks of the configured kinds, in file order
    pub fn segment(&self, config: &str) -> Vec<ConfigBlock> {
        let mut blocks = Vec::new();
        let mut current: Option<ConfigBlock> = None;

        for line in config.lines() {
            let line = line.trim_end();

            if let Some(block) = current.as_mut() {
                if !end_regex().is_match(line) {
                    if !line.is_empty() {
                        block.lines.push(line.to_string());
                    }
                    continue;
                }
                blocks.extend(current.take());
            }

            current = self.start_of(line).map(|kind| ConfigBlock {
                kind,
                header: line.to_string(),
                lines: Vec::new(),
            });
        }

        blocks.extend(current);
        blocks
    }

    fn start_of(&self, line: &str) -> Option<BlockKind> {
        self.rules
            .iter()
            .find(|(_, start)| start.is_match(line))
            .map(|(kind, _)| *kind)
    }
}
