use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Anything that can describe the current pipeline graph as text.
///
/// Dumping is synchronous and cannot fail; an empty pipeline dumps an empty
/// graph.
pub trait TopologySource: Send + Sync {
    fn dump_topology(&self) -> String;
}

impl<F> TopologySource for F
where
    F: Fn() -> String + Send + Sync,
{
    fn dump_topology(&self) -> String {
        self()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ElementState {
    #[default]
    Null,
    Ready,
    Paused,
    Playing,
}

impl ElementState {
    fn as_str(&self) -> &'static str {
        match self {
            ElementState::Null => "NULL",
            ElementState::Ready => "READY",
            ElementState::Paused => "PAUSED",
            ElementState::Playing => "PLAYING",
        }
    }

    fn fill_color(&self) -> &'static str {
        match self {
            ElementState::Null => "#cccccc",
            ElementState::Ready => "#ffffaa",
            ElementState::Paused => "#aaaaff",
            ElementState::Playing => "#aaffaa",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PipelineElement {
    pub name: String,
    /// Element type, e.g. `appsrc` or `mp4mux`
    pub factory: String,
    #[serde(default)]
    pub state: ElementState,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PipelineLink {
    pub from: String,
    pub from_pad: String,
    pub to: String,
    pub to_pad: String,
    /// Negotiated caps, if any
    #[serde(default)]
    pub caps: Option<String>,
}

/// Snapshot of a media pipeline's element graph.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineGraph {
    pub name: String,
    #[serde(default)]
    pub elements: Vec<PipelineElement>,
    #[serde(default)]
    pub links: Vec<PipelineLink>,
}

impl PipelineGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn add_element(&mut self, name: &str, factory: &str, state: ElementState) -> &mut Self {
        self.elements.push(PipelineElement {
            name: name.to_string(),
            factory: factory.to_string(),
            state,
        });
        self
    }

    pub fn link(&mut self, from: &str, from_pad: &str, to: &str, to_pad: &str, caps: Option<&str>) -> &mut Self {
        self.links.push(PipelineLink {
            from: from.to_string(),
            from_pad: from_pad.to_string(),
            to: to.to_string(),
            to_pad: to_pad.to_string(),
            caps: caps.map(str::to_string),
        });
        self
    }

    /// Render the graph in Graphviz DOT format
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        // Writing into a String cannot fail
        let _ = writeln!(dot, "digraph pipeline {{");
        let _ = writeln!(dot, "  rankdir=LR;");
        let _ = writeln!(dot, "  label=\"{}\";", escape(&self.name));
        let _ = writeln!(dot, "  node [shape=box, style=\"filled,rounded\"];");

        for element in &self.elements {
            let _ = writeln!(
                dot,
                "  \"{}\" [label=\"{}\\n({})\\n{}\", fillcolor=\"{}\"];",
                escape(&element.name),
                escape(&element.name),
                escape(&element.factory),
                element.state.as_str(),
                element.state.fill_color(),
            );
        }

        for link in &self.links {
            let mut label = format!("{} -> {}", escape(&link.from_pad), escape(&link.to_pad));
            if let Some(caps) = &link.caps {
                label.push_str("\\n");
                label.push_str(&escape(caps));
            }
            let _ = writeln!(
                dot,
                "  \"{}\" -> \"{}\" [label=\"{}\"];",
                escape(&link.from),
                escape(&link.to),
                label,
            );
        }

        dot.push_str("}\n");
        dot
    }
}

impl TopologySource for PipelineGraph {
    fn dump_topology(&self) -> String {
        self.to_dot()
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}
