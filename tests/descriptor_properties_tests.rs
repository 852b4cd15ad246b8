//! Property-based tests for descriptor parsing

use proptest::prelude::*;

use module_host::module::registry::Properties;
use module_host::{ModuleArchive, ModuleDescriptor};

fn key() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_.-]{0,15}"
}

fn value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.:=/_#!-]{0,30}"
}

fn dependency() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,10}"
}

proptest! {
    #[test]
    fn prop_key_value_round_trips(
        key in key(),
        value in value(),
        sep in prop::sample::select(vec!["=", ":", " = ", ": "]),
    ) {
        let props = Properties::parse(&format!("{}{}{}\n", key, sep, value));
        prop_assert_eq!(props.get(&key), Some(value.trim()));
    }

    #[test]
    fn prop_last_assignment_wins(key in key(), first in value(), second in value()) {
        let props = Properties::parse(&format!("{k}={}\n{k}={}\n", first, second, k = key));
        prop_assert_eq!(props.len(), 1);
        prop_assert_eq!(props.get(&key), Some(second.trim()));
    }

    #[test]
    fn prop_comment_lines_are_ignored(key in key(), value in value(), comment in value()) {
        let text = format!("# {}\n! {}\n{}={}\n", comment, comment, key, value);
        let props = Properties::parse(&text);
        prop_assert_eq!(props.len(), 1);
    }

    #[test]
    fn prop_dependencies_are_trimmed_and_ordered(
        deps in prop::collection::vec(dependency(), 0..6),
        pad in prop::sample::select(vec!["", " ", "  "]),
    ) {
        let joined = deps
            .iter()
            .map(|d| format!("{pad}{d}{pad}"))
            .collect::<Vec<_>>()
            .join(",");
        let text = format!(
            "main=Foo\nname=foo\nversion=1.0\nauthor=A\ndescription=d\ndependencies={},\n",
            joined
        );

        let descriptor = ModuleDescriptor::from_properties(
            &Properties::parse(&text),
            &ModuleArchive::new("foo.zip"),
        )
        .unwrap();
        prop_assert_eq!(descriptor.dependencies(), deps.as_slice());
    }
}
