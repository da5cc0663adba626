//! Drain options applied when the cluster is stopped
//!
//! The `--drain` flag takes a comma separated list of tokens. `all` and `none`
//! select every target at once; any other known token (`pods`, `iptables`,
//! `kubeletmanifests`) enables a single target. When `all` or `none` is present
//! the last of them decides the whole set and per-target tokens are dropped,
//! wherever they appear. Unknown tokens are ignored.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::Error;

pub const DRAIN_ALL: &str = "all";
pub const DRAIN_NONE: &str = "none";

/// Something that can be cleaned up on shutdown
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrainTarget {
    /// Delete the pods still running on the node
    Pods,
    /// Flush the iptables rules written by kube-proxy
    Iptables,
    /// Remove the static pod manifests handed to the kubelet
    KubeletManifests,
}

impl DrainTarget {
    pub const ALL: [DrainTarget; 3] = [
        DrainTarget::Pods,
        DrainTarget::Iptables,
        DrainTarget::KubeletManifests,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DrainTarget::Pods => "pods",
            DrainTarget::Iptables => "iptables",
            DrainTarget::KubeletManifests => "kubeletmanifests",
        }
    }
}

impl fmt::Display for DrainTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrainTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DrainTarget::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::ConfigError(format!("Unknown drain target: {}", s)))
    }
}

/// The resolved set of drain directives
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DrainDirectives {
    all: bool,
    none: bool,
    targets: BTreeSet<DrainTarget>,
}

impl DrainDirectives {
    /// Every target enabled through `all`
    pub fn all() -> Self {
        Self {
            all: true,
            none: false,
            targets: DrainTarget::ALL.into_iter().collect(),
        }
    }

    /// Every target disabled through `none`
    pub fn none() -> Self {
        Self {
            all: false,
            none: true,
            targets: BTreeSet::new(),
        }
    }

    /// Resolve a `--drain` option string. Never fails.
    pub fn resolve(spec: &str) -> Self {
        let mut last_all = None;
        let mut last_none = None;
        let mut targets = BTreeSet::new();

        for (index, token) in spec.split(',').enumerate() {
            match token {
                DRAIN_ALL => last_all = Some(index),
                DRAIN_NONE => last_none = Some(index),
                other => {
                    if let Ok(target) = other.parse::<DrainTarget>() {
                        targets.insert(target);
                    }
                }
            }
        }

        match (last_all, last_none) {
            (None, None) => Self {
                all: false,
                none: false,
                targets,
            },
            // `None` orders before any `Some`, so a lone wildcard also wins here
            (all, none) if all > none => Self::all(),
            _ => Self::none(),
        }
    }

    /// Whether `all` decided the directives
    pub fn wildcard_all(&self) -> bool {
        self.all
    }

    /// Whether `none` decided the directives
    pub fn wildcard_none(&self) -> bool {
        self.none
    }

    pub fn is_enabled(&self, target: DrainTarget) -> bool {
        self.targets.contains(&target)
    }

    pub fn pods(&self) -> bool {
        self.is_enabled(DrainTarget::Pods)
    }

    pub fn iptables(&self) -> bool {
        self.is_enabled(DrainTarget::Iptables)
    }

    pub fn kubelet_manifests(&self) -> bool {
        self.is_enabled(DrainTarget::KubeletManifests)
    }

    /// Enabled targets in declaration order
    pub fn enabled(&self) -> impl Iterator<Item = DrainTarget> + '_ {
        self.targets.iter().copied()
    }
}

impl FromStr for DrainDirectives {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::resolve(s))
    }
}

impl fmt::Display for DrainDirectives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.all {
            return f.write_str(DRAIN_ALL);
        }
        if self.none {
            return f.write_str(DRAIN_NONE);
        }
        let tokens: Vec<&str> = self.enabled().map(DrainTarget::as_str).collect();
        f.write_str(&tokens.join(","))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn only(targets: &[DrainTarget]) -> DrainDirectives {
        DrainDirectives {
            all: false,
            none: false,
            targets: targets.iter().copied().collect(),
        }
    }

    #[rstest]
    #[case::all("all", DrainDirectives::all())]
    #[case::none("none", DrainDirectives::none())]
    #[case::none_then_all("none,all", DrainDirectives::all())]
    #[case::all_then_none("all,none", DrainDirectives::none())]
    #[case::pods("pods", only(&[DrainTarget::Pods]))]
    #[case::all_with_pods("all,pods", DrainDirectives::all())]
    #[case::none_with_pods("none,pods", DrainDirectives::none())]
    #[case::pods_before_none("pods,none", DrainDirectives::none())]
    #[case::repeated_wildcards("all,all,none", DrainDirectives::none())]
    #[case::last_all_wins("none,all,pods,none,iptables,all", DrainDirectives::all())]
    #[case::targets("iptables,pods", only(&[DrainTarget::Pods, DrainTarget::Iptables]))]
    #[case::every_target(
        "pods,iptables,kubeletmanifests",
        only(&DrainTarget::ALL)
    )]
    #[case::empty("", DrainDirectives::default())]
    #[case::unknown("bogus,,Pods", DrainDirectives::default())]
    #[case::whitespace_is_not_trimmed(" all, pods", DrainDirectives::default())]
    fn test_resolve(#[case] input: &str, #[case] expected: DrainDirectives) {
        assert_eq!(DrainDirectives::resolve(input), expected);
    }

    #[test]
    fn test_wildcard_flags() {
        let all = DrainDirectives::resolve("all");
        assert!(all.wildcard_all());
        assert!(!all.wildcard_none());
        assert!(all.pods() && all.iptables() && all.kubelet_manifests());

        let none = DrainDirectives::resolve("none,pods");
        assert!(none.wildcard_none());
        assert!(!none.wildcard_all());
        assert_eq!(none.enabled().count(), 0);

        let empty = DrainDirectives::resolve("");
        assert!(!empty.wildcard_all());
        assert!(!empty.wildcard_none());
        assert_eq!(empty.enabled().count(), 0);
    }

    #[test]
    fn test_pods_only() {
        let directives = DrainDirectives::resolve("pods");
        assert!(directives.pods());
        assert!(!directives.iptables());
        assert!(!directives.kubelet_manifests());
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(DrainDirectives::resolve("none,all,pods").to_string(), "all");
        assert_eq!(DrainDirectives::resolve("all,none").to_string(), "none");
        assert_eq!(
            DrainDirectives::resolve("kubeletmanifests,pods,pods").to_string(),
            "pods,kubeletmanifests"
        );
        assert_eq!(DrainDirectives::resolve("").to_string(), "");
    }

    #[test]
    fn test_from_str_matches_resolve() {
        let parsed: DrainDirectives = "none,iptables".parse().unwrap();
        assert_eq!(parsed, DrainDirectives::resolve("none,iptables"));
    }

    #[test]
    fn test_target_from_str() {
        assert_eq!(
            "kubeletmanifests".parse::<DrainTarget>().unwrap(),
            DrainTarget::KubeletManifests
        );
        assert!(matches!(
            "all".parse::<DrainTarget>(),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_serialize() {
        let value = serde_json::to_value(DrainDirectives::resolve("pods")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"all": false, "none": false, "targets": ["pods"]})
        );
    }
}
