use crate::config::FileGroup;
use tracing::warn;

/// One generation request: a group instance suffixed with its iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedGroup {
    /// `<name><iteration>`, e.g. `core1`
    pub key: String,

    /// Relative paths of the member files
    pub files: Vec<String>,
}

/// Expands each group into `iterations` keyed instances, `<name>1..=<name>N`.
///
/// Order follows the configuration. If two groups expand to the same key
/// (e.g. `a1` × 1 and `a` × 11 both yield `a11`), the later file list replaces
/// the earlier one at the earlier position and a warning is logged.
#[must_use]
pub fn expand_groups(groups: &[FileGroup]) -> Vec<ExpandedGroup> {
    let mut expanded: Vec<ExpandedGroup> = Vec::new();

    for group in groups {
        for i in 1..=group.iterations {
            let key = format!("{}{}", group.name, i);
            if let Some(existing) = expanded.iter_mut().find(|g| g.key == key) {
                warn!(
                    "Expanded group key '{}' from group '{}' collides with an earlier group; its file list is replaced",
                    key, group.name
                );
                existing.files.clone_from(&group.files);
            } else {
                expanded.push(ExpandedGroup {
                    key,
                    files: group.files.clone(),
                });
            }
        }
    }

    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(expanded: &[ExpandedGroup]) -> Vec<&str> {
        expanded.iter().map(|g| g.key.as_str()).collect()
    }

    #[test]
    fn test_expands_iterations() {
        let groups = vec![FileGroup::new("core", ["a.py"], 2)];

        let expanded = expand_groups(&groups);

        assert_eq!(
            expanded,
            vec![
                ExpandedGroup {
                    key: "core1".to_string(),
                    files: vec!["a.py".to_string()],
                },
                ExpandedGroup {
                    key: "core2".to_string(),
                    files: vec!["a.py".to_string()],
                },
            ]
        );
    }

    #[test]
    fn test_every_instance_shares_file_list() {
        for n in 1..=12 {
            let groups = vec![FileGroup::new("g", ["x.py", "y.py"], n)];
            let expanded = expand_groups(&groups);

            assert_eq!(expanded.len(), n as usize);
            for (i, group) in expanded.iter().enumerate() {
                assert_eq!(group.key, format!("g{}", i + 1));
                assert_eq!(group.files, ["x.py", "y.py"]);
            }
        }
    }

    #[test]
    fn test_zero_iterations_expand_to_nothing() {
        let groups = vec![FileGroup::new("none", ["a.py"], 0)];
        assert!(expand_groups(&groups).is_empty());
    }

    #[test]
    fn test_preserves_group_order() {
        let groups = vec![
            FileGroup::new("zeta", ["z.py"], 1),
            FileGroup::new("alpha", ["a.py"], 2),
        ];

        assert_eq!(keys(&expand_groups(&groups)), ["zeta1", "alpha1", "alpha2"]);
    }

    #[test]
    fn test_colliding_keys_overwrite_in_place() {
        let groups = vec![
            FileGroup::new("a1", ["first.py"], 1),
            FileGroup::new("b", ["b.py"], 1),
            FileGroup::new("a", ["second.py"], 11),
        ];

        let expanded = expand_groups(&groups);

        assert_eq!(expanded.len(), 12);
        assert_eq!(expanded[0].key, "a11");
        assert_eq!(expanded[0].files, ["second.py"]);
        assert_eq!(expanded.iter().filter(|g| g.key == "a11").count(), 1);
    }

    #[test]
    fn test_names_with_spaces_are_kept() {
        let groups = vec![FileGroup::new("my group", ["a.py"], 1)];
        assert_eq!(keys(&expand_groups(&groups)), ["my group1"]);
    }
}
