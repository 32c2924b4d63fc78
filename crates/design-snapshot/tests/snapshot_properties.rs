//! Property tests for snapshot writes and aligned collection removal.

use design_snapshot::{CollectionEditor, ErrorMap, FieldEdit, FieldPath, Node};
use proptest::prelude::*;
use std::collections::BTreeSet;

const BRANCH_FIELDS: [&str; 3] = ["name", "description", "ratio"];

fn design(branches: usize) -> Node {
    let branches = (0..branches).map(|i| {
        Node::map([
            ("name", Node::from(format!("branch {i}"))),
            ("description", Node::from("")),
            ("ratio", Node::from(50_i64)),
            ("is_control", Node::from(i == 0)),
            ("preferences", Node::empty_list()),
        ])
    });
    Node::map([
        ("kind", Node::from("multi-pref")),
        ("pref_key", Node::from("browser.example")),
        ("branches", Node::list(branches)),
    ])
}

fn branch_field(index: usize, field: &str) -> FieldPath {
    FieldPath::key("branches").index(index).child(field)
}

fn write_strategy(branches: usize) -> impl Strategy<Value = (usize, usize, String)> {
    (0..branches, 0..BRANCH_FIELDS.len(), "[a-z]{0,8}")
}

proptest! {
    #[test]
    fn prop_writes_share_untouched_branches(
        (count, writes) in (1usize..8).prop_flat_map(|count| {
            (Just(count), prop::collection::vec(write_strategy(count), 1..12))
        })
    ) {
        let before = design(count);
        let mut after = before.clone();
        let mut written = BTreeSet::new();

        for (branch, field, value) in &writes {
            after = after
                .set_in(&branch_field(*branch, BRANCH_FIELDS[*field]), Node::from(value.clone()))
                .unwrap();
            written.insert(*branch);
        }

        for index in 0..count {
            let path = FieldPath::key("branches").index(index);
            let old = before.get_in(&path).unwrap();
            let new = after.get_in(&path).unwrap();
            if written.contains(&index) {
                prop_assert_eq!(old.get("is_control"), new.get("is_control"));
            } else {
                prop_assert!(old.ptr_eq(new), "branch {} was copied", index);
            }
        }
        prop_assert_eq!(before.get("pref_key"), after.get("pref_key"));
        prop_assert_eq!(before.get("kind"), after.get("kind"));
    }

    #[test]
    fn prop_set_is_idempotent(
        (count, branch, field, value) in (1usize..6).prop_flat_map(|count| {
            (Just(count), 0..count, 0..BRANCH_FIELDS.len(), "[a-z0-9]{0,6}")
        })
    ) {
        let root = design(count);
        let path = branch_field(branch, BRANCH_FIELDS[field]);
        let edit = FieldEdit::set(path, value);

        let once = edit.apply(&root).unwrap();
        let twice = edit.apply(&once).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_remove_keeps_errors_aligned(
        (count, remove, flagged) in (1usize..8).prop_flat_map(|count| {
            (Just(count), 0..count, prop::collection::btree_set(0..count, 0..count))
        })
    ) {
        let data = design(count);
        let mut errors = ErrorMap::new();
        for index in &flagged {
            errors = errors
                .with_messages(&branch_field(*index, "name"), [format!("bad {index}")])
                .unwrap();
        }

        let branches = FieldPath::key("branches");
        let list = data.get_in(&branches).and_then(Node::as_list).unwrap().clone();
        let (data_next, errors_next) = CollectionEditor::remove_aligned(
            &list,
            &errors.entries_at(&branches),
            remove,
            Node::empty_map,
        )
        .unwrap();

        prop_assert_eq!(data_next.len(), count - 1);
        prop_assert_eq!(errors_next.len(), data_next.len());

        for (j, entry) in data_next.iter().enumerate() {
            let original = if j < remove { j } else { j + 1 };
            let expected_name = format!("branch {original}");
            prop_assert_eq!(entry.get("name").and_then(Node::as_str), Some(expected_name.as_str()));

            let message = errors_next
                .get(j)
                .and_then(|e| e.get("name"))
                .and_then(|m| m.at(0))
                .and_then(Node::as_str)
                .map(str::to_string);
            let expected = flagged.contains(&original).then(|| format!("bad {original}"));
            prop_assert_eq!(message, expected);
        }
    }
}
