//! `--drain` option resolution as seen by the shutdown path

use kubelift::options::{DrainDirectives, DrainTarget};

#[test]
fn wildcard_overrides_targets_in_any_order() {
    for spec in ["all,pods", "pods,all", "none,pods,all", "iptables,all,kubeletmanifests"] {
        let directives = DrainDirectives::resolve(spec);
        assert!(directives.wildcard_all(), "{spec}");
        assert!(DrainTarget::ALL.iter().all(|t| directives.is_enabled(*t)), "{spec}");
    }

    for spec in ["none,pods", "pods,none", "all,pods,none", "none,iptables,kubeletmanifests"] {
        let directives = DrainDirectives::resolve(spec);
        assert!(directives.wildcard_none(), "{spec}");
        assert_eq!(directives.enabled().count(), 0, "{spec}");
    }
}

#[test]
fn equivalent_specs_resolve_alike() {
    assert_eq!(DrainDirectives::resolve("none,all"), DrainDirectives::resolve("all"));
    assert_eq!(DrainDirectives::resolve("all,none"), DrainDirectives::resolve("none"));
    assert_eq!(DrainDirectives::resolve("all,pods"), DrainDirectives::resolve("all"));
    assert_eq!(DrainDirectives::resolve("none,pods"), DrainDirectives::resolve("none"));
}

#[test]
fn canonical_form_resolves_to_itself() {
    for spec in ["all", "none", "pods", "pods,iptables", "", "bogus,kubeletmanifests"] {
        let directives = DrainDirectives::resolve(spec);
        assert_eq!(DrainDirectives::resolve(&directives.to_string()), directives, "{spec}");
    }
}
