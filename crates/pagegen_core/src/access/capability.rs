//! Capability declarations and principal checks.

use crate::error::PageGenError;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Permission a principal may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// Site-wide administration, required for delete-all.
    ManageOptions,
    /// Create and edit pages.
    EditPages,
}

/// String value for the administration capability.
pub const CAPABILITY_MANAGE_OPTIONS: &str = "manage_options";
/// String value for the page editing capability.
pub const CAPABILITY_EDIT_PAGES: &str = "edit_pages";

impl Capability {
    /// Stable string id used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ManageOptions => CAPABILITY_MANAGE_OPTIONS,
            Self::EditPages => CAPABILITY_EDIT_PAGES,
        }
    }

    /// User-facing short description.
    pub fn description(self) -> &'static str {
        match self {
            Self::ManageOptions => "Allow site-wide administration such as deleting all generated pages.",
            Self::EditPages => "Allow creating and updating pages from CSV files.",
        }
    }
}

/// Parses one capability from its configuration string.
pub fn parse_capability(value: &str) -> Result<Capability, CapabilityError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(CapabilityError::EmptyCapability);
    }

    match normalized {
        CAPABILITY_MANAGE_OPTIONS => Ok(Capability::ManageOptions),
        CAPABILITY_EDIT_PAGES => Ok(Capability::EditPages),
        other => Err(CapabilityError::UnsupportedCapability(other.to_string())),
    }
}

/// Capability parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    EmptyCapability,
    UnsupportedCapability(String),
}

impl Display for CapabilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCapability => write!(f, "capability value must not be empty"),
            Self::UnsupportedCapability(value) => write!(f, "capability is unsupported: {value}"),
        }
    }
}

impl Error for CapabilityError {}

/// The caller of a bulk operation and what it may do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    capabilities: BTreeSet<Capability>,
}

impl Principal {
    /// A principal without any capability.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            capabilities: capabilities.into_iter().collect(),
        }
    }

    /// Parses a comma separated capability list such as
    /// `manage_options,edit_pages`. Blank entries are ignored.
    pub fn from_list(list: &str) -> Result<Self, CapabilityError> {
        let capabilities = list
            .split(',')
            .filter(|item| !item.trim().is_empty())
            .map(parse_capability)
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { capabilities })
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Fails with `Unauthorized` unless the capability is held.
    pub fn require(&self, capability: Capability) -> Result<(), PageGenError> {
        if self.can(capability) {
            return Ok(());
        }
        Err(PageGenError::Unauthorized(format!(
            "missing capability `{}` ({})",
            capability.as_str(),
            capability.description()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_capability, Capability, CapabilityError, Principal};
    use crate::error::PageGenError;

    #[test]
    fn parses_supported_capabilities() {
        assert_eq!(
            parse_capability("manage_options").expect("manage_options parse"),
            Capability::ManageOptions
        );
        assert_eq!(
            parse_capability(" edit_pages ").expect("edit_pages parse"),
            Capability::EditPages
        );
    }

    #[test]
    fn rejects_empty_and_unknown_capabilities() {
        assert_eq!(
            parse_capability("  ").expect_err("empty must fail"),
            CapabilityError::EmptyCapability
        );
        assert_eq!(
            parse_capability("Manage_Options").expect_err("case variants must fail"),
            CapabilityError::UnsupportedCapability("Manage_Options".to_string())
        );
    }

    #[test]
    fn principal_from_list_ignores_blank_entries() {
        let principal = Principal::from_list("edit_pages, ,").expect("list should parse");
        assert!(principal.can(Capability::EditPages));
        assert!(!principal.can(Capability::ManageOptions));
    }

    #[test]
    fn require_denies_missing_capability() {
        let err = Principal::anonymous()
            .require(Capability::ManageOptions)
            .expect_err("anonymous must be denied");
        assert!(matches!(err, PageGenError::Unauthorized(message) if message.contains("manage_options")));

        Principal::with_capabilities([Capability::ManageOptions])
            .require(Capability::ManageOptions)
            .expect("granted capability should pass");
    }

    #[test]
    fn denial_message_names_the_capability_and_its_description() {
        let err = Principal::with_capabilities([Capability::ManageOptions])
            .require(Capability::EditPages)
            .expect_err("edit_pages was not granted");
        match err {
            PageGenError::Unauthorized(message) => {
                assert!(message.contains("edit_pages"));
                assert!(message.contains(Capability::EditPages.description()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
