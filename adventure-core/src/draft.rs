//! The in-progress character form.

use story_api::{CharacterOptions, NewCharacter};
use thiserror::Error;

/// One of the four fields of a [`CharacterDraft`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    Name,
    Race,
    CharacterClass,
    Background,
}

impl DraftField {
    /// All fields in form order.
    pub const ALL: [DraftField; 4] = [
        DraftField::Name,
        DraftField::Race,
        DraftField::CharacterClass,
        DraftField::Background,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DraftField::Name => "Name",
            DraftField::Race => "Race",
            DraftField::CharacterClass => "Class",
            DraftField::Background => "Background",
        }
    }

    /// The enumerated values this field is picked from, if it is a select.
    pub fn choices<'a>(&self, options: &'a CharacterOptions) -> Option<&'a [String]> {
        match self {
            DraftField::Name => None,
            DraftField::Race => Some(options.races.as_slice()),
            DraftField::CharacterClass => Some(options.classes.as_slice()),
            DraftField::Background => Some(options.backgrounds.as_slice()),
        }
    }

    /// Next field in form order, wrapping around.
    pub fn next(&self) -> DraftField {
        match self {
            DraftField::Name => DraftField::Race,
            DraftField::Race => DraftField::CharacterClass,
            DraftField::CharacterClass => DraftField::Background,
            DraftField::Background => DraftField::Name,
        }
    }

    /// Previous field in form order, wrapping around.
    pub fn prev(&self) -> DraftField {
        match self {
            DraftField::Name => DraftField::Background,
            DraftField::Race => DraftField::Name,
            DraftField::CharacterClass => DraftField::Race,
            DraftField::Background => DraftField::CharacterClass,
        }
    }
}

/// A draft was submitted with one or more blank fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Please fill in all character details (missing: {})", field_list(.missing))]
pub struct ValidationFailure {
    /// The blank fields, in form order.
    pub missing: Vec<DraftField>,
}

fn field_list(fields: &[DraftField]) -> String {
    fields
        .iter()
        .map(DraftField::label)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Attributes entered during character creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterDraft {
    pub name: String,
    pub race: String,
    pub character_class: String,
    pub background: String,
}

impl CharacterDraft {
    pub fn new(
        name: impl Into<String>,
        race: impl Into<String>,
        character_class: impl Into<String>,
        background: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            race: race.into(),
            character_class: character_class.into(),
            background: background.into(),
        }
    }

    pub fn get(&self, field: DraftField) -> &str {
        match field {
            DraftField::Name => &self.name,
            DraftField::Race => &self.race,
            DraftField::CharacterClass => &self.character_class,
            DraftField::Background => &self.background,
        }
    }

    pub fn set(&mut self, field: DraftField, value: impl Into<String>) {
        let value = value.into();
        match field {
            DraftField::Name => self.name = value,
            DraftField::Race => self.race = value,
            DraftField::CharacterClass => self.character_class = value,
            DraftField::Background => self.background = value,
        }
    }

    /// Fields that are blank after trimming, in form order.
    pub fn missing_fields(&self) -> Vec<DraftField> {
        DraftField::ALL
            .into_iter()
            .filter(|field| self.get(*field).trim().is_empty())
            .collect()
    }

    /// Turn the draft into a creation request, trimming every field.
    pub fn validate(&self) -> Result<NewCharacter, ValidationFailure> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ValidationFailure { missing });
        }

        Ok(NewCharacter {
            name: self.name.trim().to_string(),
            race: self.race.trim().to_string(),
            character_class: self.character_class.trim().to_string(),
            background: self.background.trim().to_string(),
        })
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// True iff every field of the draft is non-empty after trimming.
pub fn is_submittable(draft: &CharacterDraft) -> bool {
    DraftField::ALL
        .into_iter()
        .all(|field| !draft.get(field).trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_draft_is_not_submittable() {
        let draft = CharacterDraft::default();
        assert!(!is_submittable(&draft));
        assert_eq!(draft.missing_fields(), DraftField::ALL.to_vec());
    }

    #[test]
    fn test_missing_race_blocks_submission() {
        let draft = CharacterDraft::new("Kael", "", "Rogue", "Orphan");
        assert!(!is_submittable(&draft));

        let failure = draft.validate().unwrap_err();
        assert_eq!(failure.missing, vec![DraftField::Race]);
        assert_eq!(
            failure.to_string(),
            "Please fill in all character details (missing: Race)"
        );
    }

    #[test]
    fn test_whitespace_only_counts_as_empty() {
        let draft = CharacterDraft::new("   ", "Elf", "\t", "Orphan");
        assert!(!is_submittable(&draft));
        assert_eq!(
            draft.missing_fields(),
            vec![DraftField::Name, DraftField::CharacterClass]
        );
    }

    #[test]
    fn test_validate_trims_fields() {
        let draft = CharacterDraft::new("  Kael ", "Elf", " Rogue", "Orphan\n");
        assert!(is_submittable(&draft));

        let request = draft.validate().unwrap();
        assert_eq!(request.name, "Kael");
        assert_eq!(request.race, "Elf");
        assert_eq!(request.character_class, "Rogue");
        assert_eq!(request.background, "Orphan");
    }

    #[test]
    fn test_set_and_clear() {
        let mut draft = CharacterDraft::default();
        for field in DraftField::ALL {
            draft.set(field, field.label());
        }
        assert_eq!(draft.get(DraftField::CharacterClass), "Class");
        assert!(is_submittable(&draft));

        draft.clear();
        assert_eq!(draft, CharacterDraft::default());
    }

    #[test]
    fn test_field_cycle() {
        let mut field = DraftField::Name;
        for _ in 0..4 {
            field = field.next();
        }
        assert_eq!(field, DraftField::Name);
        assert_eq!(DraftField::Name.prev(), DraftField::Background);
        assert_eq!(DraftField::Background.next().prev(), DraftField::Background);
    }

    #[test]
    fn test_field_choices() {
        let options = CharacterOptions {
            races: vec!["Human".to_string(), "Elf".to_string()],
            classes: vec!["Rogue".to_string()],
            backgrounds: vec![],
        };
        assert_eq!(DraftField::Name.choices(&options), None);
        assert_eq!(DraftField::Race.choices(&options).map(<[_]>::len), Some(2));
        assert_eq!(
            DraftField::Background.choices(&options),
            Some(&[][..] as &[String])
        );
    }
}
