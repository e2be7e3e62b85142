use serde::{Deserialize, Deserializer, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Which reference fields to resolve, as a forest of paths.
///
/// Children of a reference path apply to each populated target; children of
/// `sections` apply to each section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PopulateSpec {
    pub paths: Vec<PopulatePath>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulatePath {
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub populate: Vec<PopulatePath>,
}

impl PopulatePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            populate: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: PopulateSpec) -> Self {
        for child in children.paths {
            merge_path(&mut self.populate, child);
        }
        self
    }

    /// Build the chain for a dotted path such as `sections.embeds`, hanging
    /// `leaf` off the last segment.
    fn from_dotted(dotted: &str, leaf: Vec<PopulatePath>) -> Option<Self> {
        let mut segments = dotted.split('.').filter(|s| !s.is_empty()).rev();
        let mut node = PopulatePath {
            path: segments.next()?.to_string(),
            populate: leaf,
        };
        for segment in segments {
            node = PopulatePath {
                path: segment.to_string(),
                populate: vec![node],
            };
        }
        Some(node)
    }

    fn write_dotted(&self, prefix: &str, out: &mut Vec<String>) {
        let full = if prefix.is_empty() {
            self.path.clone()
        } else {
            format!("{}.{}", prefix, self.path)
        };
        if self.populate.is_empty() {
            out.push(full);
        } else {
            for child in &self.populate {
                child.write_dotted(&full, out);
            }
        }
    }
}

fn merge_path(paths: &mut Vec<PopulatePath>, incoming: PopulatePath) {
    match paths.iter_mut().find(|existing| existing.path == incoming.path) {
        Some(existing) => {
            for child in incoming.populate {
                merge_path(&mut existing.populate, child);
            }
        }
        None => paths.push(incoming),
    }
}

impl PopulateSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse mongoose-style paths: whitespace separated, dots for nesting.
    pub fn parse(text: &str) -> Self {
        let mut spec = Self::new();
        for dotted in text.split_whitespace() {
            if let Some(path) = PopulatePath::from_dotted(dotted, Vec::new()) {
                merge_path(&mut spec.paths, path);
            }
        }
        spec
    }

    pub fn path(dotted: &str) -> Self {
        Self::parse(dotted)
    }

    pub fn and(mut self, dotted: &str) -> Self {
        for path in Self::parse(dotted).paths {
            merge_path(&mut self.paths, path);
        }
        self
    }

    pub fn push(&mut self, path: PopulatePath) {
        merge_path(&mut self.paths, path);
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FromStr for PopulateSpec {
    type Err = Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(text))
    }
}

impl fmt::Display for PopulateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dotted = Vec::new();
        for path in &self.paths {
            path.write_dotted("", &mut dotted);
        }
        f.write_str(&dotted.join(" "))
    }
}

/// Accepted JSON shapes: `"a b.c"`, `{ "path": "a", "populate": ... }`, or
/// an array of either.
#[derive(Deserialize)]
#[serde(untagged)]
enum SpecRepr {
    Text(String),
    Many(Vec<SpecRepr>),
    Object {
        path: String,
        #[serde(default)]
        populate: Option<Box<SpecRepr>>,
    },
}

impl SpecRepr {
    fn into_spec(self) -> PopulateSpec {
        match self {
            SpecRepr::Text(text) => PopulateSpec::parse(&text),
            SpecRepr::Many(items) => {
                let mut spec = PopulateSpec::new();
                for item in items {
                    for path in item.into_spec().paths {
                        spec.push(path);
                    }
                }
                spec
            }
            SpecRepr::Object { path, populate } => {
                let children = populate.map(|p| p.into_spec().paths).unwrap_or_default();
                let mut spec = PopulateSpec::new();
                if let Some(node) = PopulatePath::from_dotted(&path, children) {
                    spec.push(node);
                }
                spec
            }
        }
    }
}

impl<'de> Deserialize<'de> for PopulateSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        SpecRepr::deserialize(deserializer).map(SpecRepr::into_spec)
    }
}

impl<'de> Deserialize<'de> for PopulatePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut paths = SpecRepr::deserialize(deserializer)?.into_spec().paths;
        match paths.len() {
            1 => Ok(paths.remove(0)),
            n => Err(serde::de::Error::custom(format!(
                "expected exactly one populate path, found {}",
                n
            ))),
        }
    }
}
