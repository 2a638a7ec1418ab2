//! Declared build actions and the graph that orders them.
//!
//! Actions are declared, never run here: the graph is handed to an external
//! scheduler as JSON. An action depends on another either by name or by
//! consuming one of its outputs.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use thiserror::Error;

use crate::util::hash::Fingerprint;

/// What an action does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// Dump the tip API with its `.hash`.
    DumpApi,
    /// `current` must equal the tip dump.
    CheckEquality,
    /// Always fails with `message`.
    Fail { message: String },
    /// Verify the stored hash of one dump.
    CheckHash { version: String },
    /// `new` must be a compatible evolution of `old`.
    CheckCompatibility { old: String, new: String },
    HasDevelopment,
    UpdateApi,
    FreezeApi,
    /// Generate one binding.
    Generate {
        backend: String,
        version: String,
    },
    /// Groups other actions.
    Phony,
}

impl ActionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::DumpApi => "dump-api",
            ActionKind::CheckEquality => "check-equality",
            ActionKind::Fail { .. } => "fail",
            ActionKind::CheckHash { .. } => "check-hash",
            ActionKind::CheckCompatibility { .. } => "check-compatibility",
            ActionKind::HasDevelopment => "has-development",
            ActionKind::UpdateApi => "update-api",
            ActionKind::FreezeApi => "freeze-api",
            ActionKind::Generate { .. } => "generate",
            ActionKind::Phony => "phony",
        }
    }
}

/// One declared action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    /// Unique name
    pub name: String,

    /// Interface the action belongs to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,

    #[serde(flatten)]
    pub kind: ActionKind,

    /// Command line; empty for actions carried out by aidlgate itself
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    pub inputs: Vec<PathBuf>,

    pub outputs: Vec<PathBuf>,

    /// Names of actions that must run first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
}

impl Action {
    pub fn new(name: impl Into<String>, kind: ActionKind) -> Self {
        Action {
            name: name.into(),
            interface: None,
            kind,
            command: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            deps: Vec::new(),
        }
    }

    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    pub fn command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }

    pub fn input(mut self, input: impl Into<PathBuf>) -> Self {
        self.inputs.push(input.into());
        self
    }

    pub fn inputs(mut self, inputs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.outputs.push(output.into());
        self
    }

    pub fn dep(mut self, dep: impl Into<String>) -> Self {
        let dep = dep.into();
        if !self.deps.contains(&dep) {
            self.deps.push(dep);
        }
        self
    }

    pub fn deps(self, deps: impl IntoIterator<Item = String>) -> Self {
        deps.into_iter().fold(self, Action::dep)
    }

    /// Stable digest of everything that defines this action.
    pub fn fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.update_str(&self.name);
        fp.update_str(self.kind.label());
        fp.update_strs(self.command.iter().map(String::as_str));
        for path in self.inputs.iter().chain(&self.outputs) {
            fp.update_str(&path.to_string_lossy());
        }
        fp.update_strs(self.deps.iter().map(String::as_str));
        fp.finish_short()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("action `{0}` declared twice")]
    DuplicateAction(String),

    #[error("`{output}` is an output of both `{first}` and `{second}`")]
    DuplicateOutput {
        output: PathBuf,
        first: String,
        second: String,
    },

    #[error("action `{action}` depends on unknown action `{dep}`")]
    UnknownDep { action: String, dep: String },

    #[error("action cycle through `{0}`")]
    Cycle(String),
}

/// Every declared action, in declaration order.
#[derive(Debug, Default)]
pub struct ActionGraph {
    actions: Vec<Action>,
    by_name: HashMap<String, usize>,
    producers: BTreeMap<PathBuf, usize>,
}

impl ActionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an action. Names and outputs must be unique.
    pub fn add(&mut self, action: Action) -> Result<(), ActionError> {
        if self.by_name.contains_key(&action.name) {
            return Err(ActionError::DuplicateAction(action.name));
        }
        for output in &action.outputs {
            if let Some(&first) = self.producers.get(output) {
                return Err(ActionError::DuplicateOutput {
                    output: output.clone(),
                    first: self.actions[first].name.clone(),
                    second: action.name.clone(),
                });
            }
        }

        let index = self.actions.len();
        for output in &action.outputs {
            self.producers.insert(output.clone(), index);
        }
        self.by_name.insert(action.name.clone(), index);
        self.actions.push(action);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Action> {
        self.by_name.get(name).map(|&i| &self.actions[i])
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Names of the actions `name` waits for, through deps and inputs.
    pub fn prerequisites(&self, name: &str) -> Vec<&str> {
        let Some(action) = self.get(name) else {
            return Vec::new();
        };
        let mut result: Vec<&str> = action
            .deps
            .iter()
            .filter_map(|d| self.get(d).map(|a| a.name.as_str()))
            .collect();
        for input in &action.inputs {
            if let Some(&i) = self.producers.get(input) {
                let producer = self.actions[i].name.as_str();
                if producer != name && !result.contains(&producer) {
                    result.push(producer);
                }
            }
        }
        result
    }

    /// Actions ordered so that prerequisites come first.
    pub fn order(&self) -> Result<Vec<&Action>, ActionError> {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..self.actions.len()).map(|i| graph.add_node(i)).collect();

        for (i, action) in self.actions.iter().enumerate() {
            for dep in &action.deps {
                let Some(&j) = self.by_name.get(dep) else {
                    return Err(ActionError::UnknownDep {
                        action: action.name.clone(),
                        dep: dep.clone(),
                    });
                };
                graph.update_edge(nodes[j], nodes[i], ());
            }
            for input in &action.inputs {
                if let Some(&j) = self.producers.get(input) {
                    if j != i {
                        graph.update_edge(nodes[j], nodes[i], ());
                    }
                }
            }
        }

        let order = toposort(&graph, None)
            .map_err(|c| ActionError::Cycle(self.actions[graph[c.node_id()]].name.clone()))?;
        Ok(order.into_iter().map(|n| &self.actions[graph[n]]).collect())
    }

    /// Digest of the whole graph.
    pub fn fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();
        for action in &self.actions {
            fp.update_str(&action.fingerprint());
        }
        fp.finish_short()
    }

    /// Ordered JSON for external schedulers.
    pub fn to_json(&self) -> anyhow::Result<String> {
        #[derive(Serialize)]
        struct Out<'a> {
            fingerprint: String,
            actions: Vec<&'a Action>,
        }
        let out = Out {
            fingerprint: self.fingerprint(),
            actions: self.order()?,
        };
        Ok(serde_json::to_string_pretty(&out)?)
    }
}
