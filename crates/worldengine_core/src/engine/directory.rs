use crate::model::{NoteRef, NoteType, ResolvedLink, WbNote};
use crate::schema::Link;
use std::collections::BTreeMap;

/// Path-ordered snapshot of tracked notes used to resolve links.
#[derive(Debug, Clone, Default)]
pub struct NoteDirectory {
    entries: BTreeMap<String, NoteRef>,
}

impl NoteDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_notes<'a>(notes: impl IntoIterator<Item = &'a WbNote>) -> Self {
        Self {
            entries: notes
                .into_iter()
                .map(|note| (note.file_path().to_string(), note.to_ref()))
                .collect(),
        }
    }

    pub fn insert(&mut self, note: NoteRef) {
        self.entries.insert(note.path.clone(), note);
    }

    pub fn by_path(&self, path: &str) -> Option<&NoteRef> {
        self.entries.get(path)
    }

    /// First note named exactly `name`, in path order.
    pub fn by_name(&self, name: &str) -> Option<&NoteRef> {
        self.entries.values().find(|entry| entry.name == name)
    }

    /// Resolves `link` against the snapshot.
    ///
    /// Targets containing `/` are vault paths (with or without `.md`); other
    /// targets match note names, exactly first and then ignoring case. When
    /// `expected` is set, notes of other variants are never returned.
    pub fn resolve(&self, link: Link, expected: Option<NoteType>) -> ResolvedLink {
        let accepts = |entry: &&NoteRef| expected.map_or(true, |kind| entry.note_type == kind);
        let found = if link.is_path() {
            let target = link.target.trim_start_matches('/');
            self.entries
                .get(target)
                .or_else(|| self.entries.get(&format!("{target}.md")))
                .filter(accepts)
        } else {
            self.entries
                .values()
                .filter(accepts)
                .find(|entry| entry.name == link.target)
                .or_else(|| {
                    self.entries
                        .values()
                        .filter(accepts)
                        .find(|entry| entry.name.eq_ignore_ascii_case(&link.target))
                })
        };
        ResolvedLink {
            note: found.cloned(),
            link,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NoteDirectory;
    use crate::model::{NoteRef, NoteType};
    use crate::schema::Link;

    fn entry(path: &str, name: &str, note_type: NoteType) -> NoteRef {
        NoteRef {
            path: path.to_string(),
            name: name.to_string(),
            note_type,
        }
    }

    fn directory() -> NoteDirectory {
        let mut directory = NoteDirectory::new();
        directory.insert(entry("b/Ana.md", "Ana", NoteType::Character));
        directory.insert(entry("a/Ana.md", "Ana", NoteType::Settlement));
        directory.insert(entry("World/Arden.md", "Arden", NoteType::Nation));
        directory
    }

    #[test]
    fn by_name_returns_first_in_path_order() {
        assert_eq!(directory().by_name("Ana").unwrap().path, "a/Ana.md");
    }

    #[test]
    fn expected_type_filters_name_matches() {
        let link = Link::parse("[[Ana]]").unwrap();
        let resolved = directory().resolve(link, Some(NoteType::Character));
        assert_eq!(resolved.note.unwrap().path, "b/Ana.md");
    }

    #[test]
    fn path_links_accept_missing_extension() {
        let resolved = directory().resolve(Link::parse("[[World/Arden]]").unwrap(), None);
        assert_eq!(resolved.note.unwrap().name, "Arden");
        let wrong_type = directory().resolve(
            Link::parse("[[World/Arden]]").unwrap(),
            Some(NoteType::Character),
        );
        assert!(wrong_type.note.is_none());
    }

    #[test]
    fn name_links_fall_back_to_case_insensitive_match() {
        let resolved = directory().resolve(Link::parse("[[arden|the kingdom]]").unwrap(), None);
        assert_eq!(resolved.note.unwrap().path, "World/Arden.md");
        assert!(!directory()
            .resolve(Link::parse("[[Brenn]]").unwrap(), None)
            .is_resolved());
    }
}
