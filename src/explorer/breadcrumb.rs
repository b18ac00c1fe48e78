//! Breadcrumb trail derived from an `ObjectPath`.

use std::fmt;

use super::path::ObjectPath;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub label: String,
    pub path: ObjectPath,
    /// The last crumb is "here" and is not actionable.
    pub current: bool,
}

/// Ordered waypoints from the root instance down to the current path.
///
/// Always `path.depth() + 1` entries; entry `i` resolves to the path
/// truncated to `i` segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    crumbs: Vec<Crumb>,
}

impl Breadcrumb {
    pub fn build(path: &ObjectPath) -> Self {
        let depth = path.depth();
        let mut crumbs = Vec::with_capacity(depth + 1);

        crumbs.push(Crumb {
            label: path.root_label(),
            path: path.truncate(0),
            current: depth == 0,
        });
        for (i, segment) in path.segments().iter().enumerate() {
            crumbs.push(Crumb {
                label: segment.clone(),
                path: path.truncate(i + 1),
                current: i + 1 == depth,
            });
        }

        Self { crumbs }
    }

    pub fn len(&self) -> usize {
        self.crumbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crumbs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Crumb> {
        self.crumbs.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Crumb> {
        self.crumbs.iter()
    }

    /// Path behind an actionable crumb; `None` for the current crumb or an
    /// index past the end.
    pub fn target(&self, index: usize) -> Option<&ObjectPath> {
        self.crumbs
            .get(index)
            .filter(|crumb| !crumb.current)
            .map(|crumb| &crumb.path)
    }

    pub fn current(&self) -> Option<&Crumb> {
        self.crumbs.last()
    }
}

impl fmt::Display for Breadcrumb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, crumb) in self.crumbs.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&crumb.label)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_only_breadcrumb() {
        let trail = Breadcrumb::build(&ObjectPath::root("PalPlayerState", 0));
        assert_eq!(trail.len(), 1);
        assert_eq!(trail.get(0).unwrap().label, "PalPlayerState[0]");
        assert!(trail.get(0).unwrap().current);
        assert!(trail.target(0).is_none());
    }

    #[test]
    fn test_segment_labels_and_targets() {
        let path =
            ObjectPath::parse("PalPlayerState", 2, "PawnPrivate.CharacterParameterComponent");
        let trail = Breadcrumb::build(&path);

        let labels: Vec<_> = trail.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(
            labels,
            ["PalPlayerState[2]", "PawnPrivate", "CharacterParameterComponent"]
        );

        assert_eq!(trail.target(0), Some(&ObjectPath::root("PalPlayerState", 2)));
        assert_eq!(
            trail.target(1).and_then(|p| p.to_request_path()).as_deref(),
            Some("PawnPrivate")
        );
        assert!(trail.target(2).is_none());
        assert!(trail.target(3).is_none());
        assert_eq!(trail.current().unwrap().path, path);
    }

    #[test]
    fn test_display_joins_labels() {
        let trail = Breadcrumb::build(&ObjectPath::parse("PalPlayerState", 0, "A.B"));
        assert_eq!(trail.to_string(), "PalPlayerState[0].A.B");
    }
}
