//! Outcome predictor adapter.
//!
//! The expected-points and win-probability models are tree ensembles
//! trained offline (training is not this crate's job) and exported as one
//! JSON artifact. At runtime they are loaded once, validated against the
//! feature-vector contract, and treated as immutable for the whole batch.
//! A missing or malformed artifact is a precondition failure, not a
//! retryable error: nothing downstream of prediction can run without it.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::analytics::features::{FEATURE_NAMES, NUM_FEATURES};

/// Supported artifact schema version.
const ARTIFACT_VERSION: u32 = 1;

/// One node of a decision tree. Split nodes route on
/// `x[feature] <= threshold` (left) vs `>` (right); leaves carry the
/// tree's output — a point estimate for regression trees, a class-1
/// fraction for classification trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A single decision tree, nodes indexed from the root at 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    /// Walk the tree for one input. Node indices were validated on load,
    /// and every step moves to a strictly later-validated node, so the walk
    /// is bounded by the node count.
    fn evaluate(&self, x: &[f64; NUM_FEATURES]) -> f64 {
        let mut idx = 0;
        for _ in 0..self.nodes.len() {
            match self.nodes[idx] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[feature] <= threshold { left } else { right };
                }
            }
        }
        // A cycle would have been rejected by validation; treat as a dead leaf.
        0.0
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.nodes.is_empty() {
            bail!("{name} model contains an empty tree");
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= NUM_FEATURES {
                    bail!("{name} tree node {i} splits on unknown feature index {feature}");
                }
                if *left >= self.nodes.len() || *right >= self.nodes.len() {
                    bail!("{name} tree node {i} has an out-of-range child");
                }
                if *left <= i || *right <= i {
                    bail!("{name} tree node {i} points backwards (cycle risk)");
                }
            }
        }
        Ok(())
    }
}

/// A forest: the ensemble's prediction is the mean over its trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forest {
    pub trees: Vec<Tree>,
}

impl Forest {
    fn predict(&self, x: &[f64; NUM_FEATURES]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.evaluate(x)).sum();
        sum / self.trees.len() as f64
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.trees.is_empty() {
            bail!("{name} model has no trees");
        }
        for tree in &self.trees {
            tree.validate(name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Artifact {
    version: u32,
    feature_names: Vec<String>,
    ep: Forest,
    wp: Forest,
}

/// Predictor output for one play state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Expected points scored on the current drive, possessing team's view.
    pub expected_points: f64,
    /// Probability the possessing team wins, in [0, 1].
    pub win_probability: f64,
}

/// The loaded, validated EP + WP models.
pub struct Predictor {
    ep: Forest,
    wp: Forest,
}

impl Predictor {
    /// Load the artifact from disk. Absence is fatal.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            bail!("predictor artifact not found at {path}; train and export the EP/WP models first");
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading predictor artifact {path}"))?;
        Self::from_json(&raw).with_context(|| format!("invalid predictor artifact {path}"))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let artifact: Artifact =
            serde_json::from_str(raw).context("artifact is not valid model JSON")?;
        if artifact.version != ARTIFACT_VERSION {
            bail!(
                "artifact version {} unsupported (expected {})",
                artifact.version,
                ARTIFACT_VERSION
            );
        }
        if artifact.feature_names != FEATURE_NAMES {
            bail!(
                "artifact feature layout {:?} does not match this build's {:?}",
                artifact.feature_names,
                FEATURE_NAMES
            );
        }
        artifact.ep.validate("expected-points")?;
        artifact.wp.validate("win-probability")?;
        Ok(Predictor {
            ep: artifact.ep,
            wp: artifact.wp,
        })
    }

    /// Pure prediction for one feature vector.
    pub fn predict(&self, features: &[f64; NUM_FEATURES]) -> Prediction {
        Prediction {
            expected_points: self.ep.predict(features),
            win_probability: self.wp.predict(features).clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn leaf_forest(values: &[f64]) -> String {
        let trees: Vec<String> = values
            .iter()
            .map(|v| format!(r#"{{"nodes":[{{"value":{v}}}]}}"#))
            .collect();
        format!(r#"{{"trees":[{}]}}"#, trees.join(","))
    }

    fn artifact(ep: &str, wp: &str) -> String {
        let names: Vec<String> = FEATURE_NAMES.iter().map(|n| format!("\"{n}\"")).collect();
        format!(
            r#"{{"version":1,"feature_names":[{}],"ep":{ep},"wp":{wp}}}"#,
            names.join(",")
        )
    }

    #[test]
    fn forest_prediction_is_mean_of_trees() {
        let raw = artifact(&leaf_forest(&[1.0, 3.0]), &leaf_forest(&[0.25, 0.75]));
        let p = Predictor::from_json(&raw).unwrap();
        let out = p.predict(&[0.0; NUM_FEATURES]);
        assert_relative_eq!(out.expected_points, 2.0);
        assert_relative_eq!(out.win_probability, 0.5);
    }

    #[test]
    fn split_routes_on_threshold() {
        // Split on distance (index 4): close to the goal scores higher.
        let ep = r#"{"trees":[{"nodes":[
            {"feature":4,"threshold":20.0,"left":1,"right":2},
            {"value":4.5},
            {"value":0.8}
        ]}]}"#;
        let raw = artifact(ep, &leaf_forest(&[0.5]));
        let p = Predictor::from_json(&raw).unwrap();

        let mut near = [0.0; NUM_FEATURES];
        near[4] = 5.0;
        let mut far = [0.0; NUM_FEATURES];
        far[4] = 90.0;
        assert_relative_eq!(p.predict(&near).expected_points, 4.5);
        assert_relative_eq!(p.predict(&far).expected_points, 0.8);
    }

    #[test]
    fn mismatched_feature_names_are_rejected() {
        let names: Vec<String> = FEATURE_NAMES
            .iter()
            .rev()
            .map(|n| format!("\"{n}\""))
            .collect();
        let raw = format!(
            r#"{{"version":1,"feature_names":[{}],"ep":{},"wp":{}}}"#,
            names.join(","),
            leaf_forest(&[1.0]),
            leaf_forest(&[0.5])
        );
        assert!(Predictor::from_json(&raw).is_err());
    }

    #[test]
    fn wrong_version_is_rejected() {
        let raw = artifact(&leaf_forest(&[1.0]), &leaf_forest(&[0.5]))
            .replace("\"version\":1", "\"version\":9");
        assert!(Predictor::from_json(&raw).is_err());
    }

    #[test]
    fn out_of_range_children_are_rejected() {
        let ep = r#"{"trees":[{"nodes":[
            {"feature":0,"threshold":0.5,"left":1,"right":7},
            {"value":1.0}
        ]}]}"#;
        let raw = artifact(ep, &leaf_forest(&[0.5]));
        assert!(Predictor::from_json(&raw).is_err());
    }

    #[test]
    fn missing_file_is_fatal() {
        assert!(Predictor::load("/nonexistent/model.json").is_err());
    }
}
