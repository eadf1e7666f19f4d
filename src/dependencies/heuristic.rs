//! Package grouping for archives without a usable build descriptor.

use std::collections::BTreeSet;

/// Group the class directories of an archive into package identities.
///
/// `dirs` are `/`-separated parent directories of class entries. Directories are processed in
/// sorted order: one already covered by a group is skipped, one sharing more than
/// `min_common_depth` leading segments with an existing group merges with it into the common
/// prefix (absorbing every other group under that prefix), anything else starts a new group.
///
/// ```rust
/// use jarscope::dependencies::package_groups;
///
/// let groups = package_groups(
///     ["com/acme/tools/io", "com/acme/tools/net", "com/acme/util", "org/other"],
///     2,
/// );
/// assert_eq!(groups, vec!["com.acme.tools", "com.acme.util", "org.other"]);
/// ```
pub fn package_groups<'a, I>(dirs: I, min_common_depth: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let sorted: BTreeSet<Vec<&str>> = dirs
        .into_iter()
        .map(|dir| {
            dir.split('/')
                .filter(|segment| !segment.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|segments| !segments.is_empty() && segments[0] != "META-INF")
        .collect();

    let mut groups: Vec<Vec<&str>> = Vec::new();
    for dir in sorted {
        if groups.iter().any(|group| dir.starts_with(group)) {
            continue;
        }

        let merge = groups.iter().find_map(|group| {
            let common = common_prefix_len(group, &dir);
            (common > min_common_depth).then(|| dir[..common].to_vec())
        });

        match merge {
            Some(prefix) => {
                groups.retain(|group| !group.starts_with(&prefix));
                groups.push(prefix);
            }
            None => groups.push(dir),
        }
    }

    let mut packages: Vec<String> = groups.iter().map(|group| group.join(".")).collect();
    packages.sort();
    packages
}

fn common_prefix_len(left: &[&str], right: &[&str]) -> usize {
    left.iter()
        .zip(right)
        .take_while(|(a, b)| a == b)
        .count()
}

/// Parent directory of a class entry, `None` for root-level entries.
#[must_use]
pub fn entry_dir(entry: &str) -> Option<&str> {
    entry.rsplit_once('/').map(|(dir, _)| dir)
}
