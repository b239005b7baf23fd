use std::{collections::BTreeMap, io, path::Path};

use serde::{Deserialize, Serialize};

use crate::domain::{Expression, ModuleCode, Operator};

/// Lookup tables that steer parsing.
///
/// The tables hold the special cases that free text cannot express: strings
/// that must not be parsed, hand-written results for known-bad strings,
/// placeholder codes that stand for a group of modules, and so on. They are
/// plain data so they can be extended from a TOML file without touching the
/// parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Rules {
    /// Substrings that mark a prerequisite as prose rather than a boolean
    /// expression over module codes.
    restricted: Vec<String>,

    /// Hand-written results for exact prerequisite strings.
    prerequisite_exceptions: Vec<PrerequisiteException>,

    /// Placeholder codes in preclusion text that stand for a list of codes.
    equivalence_groups: BTreeMap<ModuleCode, Vec<ModuleCode>>,

    /// Extra preclusions for modules whose text omits them.
    manual_preclusions: BTreeMap<String, Vec<ModuleCode>>,

    /// Families of modules that all preclude one another.
    preclusion_groups: Vec<PreclusionGroup>,

    /// Canonical codes for records whose code field is malformed.
    code_aliases: BTreeMap<String, String>,
}

/// A hand-written parse result for one exact prerequisite string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerequisiteException {
    /// The full prerequisite text this entry applies to.
    pub text: String,

    /// Operator joining `modules`. When absent the text is kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,

    /// The modules required.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleCode>,
}

impl PrerequisiteException {
    /// The expression this exception stands for.
    #[must_use]
    pub fn expression(&self) -> Expression {
        self.operator
            .and_then(|operator| Expression::from_codes(operator, &self.modules))
            .unwrap_or_else(|| Expression::Opaque(self.text.clone()))
    }
}

/// A named family of modules which preclude each other.
///
/// A module belongs to the group when its code starts with `prefix` or
/// contains `contains`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreclusionGroup {
    /// Human-readable name, used in logs.
    pub name: String,

    /// Code prefix selecting members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Code substring selecting members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,

    /// Every module in the family.
    pub modules: Vec<ModuleCode>,
}

impl PreclusionGroup {
    /// Whether the module `code` belongs to this group.
    #[must_use]
    pub fn matches(&self, code: &str) -> bool {
        self.prefix.as_deref().is_some_and(|p| code.starts_with(p))
            || self.contains.as_deref().is_some_and(|c| code.contains(c))
    }
}

/// Errors that can occur while loading rules from disk.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    /// The rules file could not be read.
    #[error("failed to read rules file: {0}")]
    Read(#[from] io::Error),
    /// The rules file is not valid TOML, or does not match the schema.
    #[error("failed to parse rules file: {0}")]
    Parse(#[from] toml::de::Error),
    /// The rules could not be rendered as TOML.
    #[error("failed to serialise rules: {0}")]
    Serialise(#[from] toml::ser::Error),
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            restricted: default_restricted(),
            prerequisite_exceptions: default_prerequisite_exceptions(),
            equivalence_groups: default_equivalence_groups(),
            manual_preclusions: default_manual_preclusions(),
            preclusion_groups: default_preclusion_groups(),
            code_aliases: default_code_aliases(),
        }
    }
}

impl Rules {
    /// Loads rules from a TOML file at the given path.
    ///
    /// Tables missing from the file keep their built-in contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Saves the rules to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules cannot be serialised or the file cannot
    /// be written.
    pub fn save(&self, path: &Path) -> Result<(), RulesError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Renders the rules as a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules cannot be serialised.
    pub fn to_toml(&self) -> Result<String, RulesError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The first restricted-vocabulary marker found in `text`, if any.
    #[must_use]
    pub fn restricted_marker(&self, text: &str) -> Option<&str> {
        self.restricted
            .iter()
            .map(String::as_str)
            .find(|marker| text.contains(marker))
    }

    /// The hand-written result for this exact prerequisite string, if any.
    #[must_use]
    pub fn prerequisite_exception(&self, text: &str) -> Option<Expression> {
        self.prerequisite_exceptions
            .iter()
            .find(|exception| exception.text == text)
            .map(PrerequisiteException::expression)
    }

    /// The expansion of a placeholder code, if `code` is one.
    #[must_use]
    pub fn equivalence_group(&self, code: &ModuleCode) -> Option<&[ModuleCode]> {
        self.equivalence_groups.get(code).map(Vec::as_slice)
    }

    /// Extra preclusions recorded by hand for `code`.
    #[must_use]
    pub fn manual_preclusions(&self, code: &str) -> &[ModuleCode] {
        self.manual_preclusions
            .get(code)
            .map_or(&[], Vec::as_slice)
    }

    /// The first preclusion group `code` belongs to, if any.
    #[must_use]
    pub fn preclusion_group(&self, code: &str) -> Option<&PreclusionGroup> {
        self.preclusion_groups.iter().find(|group| group.matches(code))
    }

    /// The canonical form of a record's module code.
    #[must_use]
    pub fn canonical_code<'a>(&'a self, code: &'a str) -> &'a str {
        self.code_aliases.get(code).map_or(code, String::as_str)
    }
}

/// Wraps a built-in code literal. The test suite checks every literal is a
/// valid module code.
fn code(s: &str) -> ModuleCode {
    ModuleCode::from_match(s)
}

fn codes(list: &[&str]) -> Vec<ModuleCode> {
    list.iter().copied().map(code).collect()
}

fn default_restricted() -> Vec<String> {
    [
        "USP",
        "Cohort",
        "AY20",
        "H2 ",
        "Qualifying English Test",
        "grade",
        "Grade",
        "H1 ",
        "A-level",
        "PL3232 - PL3236",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn exception(text: &str, operator: Option<Operator>, modules: &[&str]) -> PrerequisiteException {
    PrerequisiteException {
        text: text.to_string(),
        operator,
        modules: codes(modules),
    }
}

fn default_prerequisite_exceptions() -> Vec<PrerequisiteException> {
    use Operator::{And, Or};

    vec![
        exception(
            "CS3241, PC1221, MA1521 and MA1101R",
            Some(And),
            &["CS3241", "PC1221", "MA1521", "MA1101R"],
        ),
        exception(
            "CS3241, PC1221, MA1521and MA1101R",
            Some(And),
            &["CS3241", "PC1221", "MA1521", "MA1101R"],
        ),
        exception(
            "RE4221 ADVANCED URBAN PLANNING THEORIES, RE4222 PUBLIC POLICY AND REAL ESTATE \
             MARKETS.",
            Some(And),
            &["RE4221", "RE4222"],
        ),
        exception(
            "Pass 80 MCs and [CS3240, IS2150, IS3230 and IS3150]",
            Some(And),
            &["CS3240", "IS2150", "IS3230", "IS3150"],
        ),
        exception(
            "CS2261 or IS2103 (applicable to intakes from AY2005/06 to AY2007/08) or [(CS2261 or \
             IS2103) and (CS2301 or IS2101)] (applicable to intakes from AY2008/09 onwards)",
            Some(And),
            &["IS2103", "IS2101"],
        ),
        exception(
            "For Applied Chemistry Students: Polymer Chemistry II (CM3265). For Chemistry \
             students: Organic Reaction Mechanisms (CM3221).",
            None,
            &[],
        ),
        exception("Pass ID 2105 & 2106", Some(And), &["ID2105", "ID2106"]),
        exception("Pass ID 1105 & 1106", Some(And), &["ID1105", "ID1106"]),
        exception("Pass ID 3105 & 3106", Some(And), &["ID3105", "ID3106"]),
        exception(
            "ME21234 Fluid Mechanics I ME2114 Mechanics of Materials II",
            Some(And),
            &["ME2134", "ME2114"],
        ),
        exception(
            "LAK3202 Korean 4, LAK3203 Korean for Academic Purposes or by placement test.",
            Some(Or),
            &["LAK3202", "LAK3203"],
        ),
        exception(
            "SOC students: CS1020 or its equivalent; Other students:NM2217 or NM3209 or the \
             prerequisites for SoC students",
            Some(Or),
            &["CS1020", "NM2217", "NM3209"],
        ),
    ]
}

fn default_equivalence_groups() -> BTreeMap<ModuleCode, Vec<ModuleCode>> {
    BTreeMap::from([
        (
            code("XX3311"),
            codes(&[
                "CM3311", "LSM3311", "MA3311", "PC3311", "QF3311", "ST3311", "ZB3311",
            ]),
        ),
        (
            code("XX3312"),
            codes(&["QF3312", "PC3312", "CM3312", "MA3312", "ST3312", "PR3312"]),
        ),
    ])
}

fn default_manual_preclusions() -> BTreeMap<String, Vec<ModuleCode>> {
    BTreeMap::from([("CG1101".to_string(), codes(&["CS1010", "CS1010E"]))])
}

fn default_preclusion_groups() -> Vec<PreclusionGroup> {
    vec![
        PreclusionGroup {
            name: "freshman seminars".to_string(),
            prefix: Some("FM".to_string()),
            contains: None,
            modules: codes(&[
                "FMA1201B", "FMD1203", "FMD1202", "FMD1201", "FMD1204", "FMA1202S", "FMA1202M",
                "FMA1202N", "FMA1202H", "FMA1202F", "FMS1211C", "FMS1211B", "FME1206", "FME1202",
                "FME1201", "FMS1213B", "FMS1209P", "FMS1209M", "FMS1209C", "FMS1215B",
                "FMS1221B", "FMS1217B", "FMS1223B", "FMS1203B", "FMS1203C", "FMS1203M",
                "FMS1203P", "FMS1203S", "FMS1201D", "FMS1201S", "FMS1207P", "FMS1207M",
                "FMS1207C", "FMS1205S", "FMS1205P", "FMS1205C", "FMS1205M", "FMA1205M",
                "FMS1218B", "FMA1201L", "FMA1201N", "FMA1201H", "FMA1201J", "FMA1201P",
                "FMA1201Q", "FMA1201S", "FMS1204P", "FMS1204M", "FMA1203Q", "FMA1203H",
                "FMA1203M", "FMA1203F", "FMS1210B", "FMS1210C", "FMS1210M", "FMS1210P",
                "FMS1212B", "FMS1214B", "FMS1208P", "FMS1208C", "FMS1208B", "FMS1208M",
                "FMS1216B", "FMS1220B", "FMS1222B", "FMS1211P", "FMS1224B", "FMS1202M",
                "FMS1202C", "FMS1206P", "FMS1206C", "FMS1204S", "FMS1204C", "FMS1204B",
                "FMA1204H", "FMA1204M", "FMC1205", "FMC1201", "FMC1202", "FMC1203", "FMS1219B",
            ]),
        },
        PreclusionGroup {
            name: "series internships".to_string(),
            prefix: None,
            contains: Some("3550".to_string()),
            modules: codes(&[
                "MS3550", "SE3550", "IEU3550", "JS3550", "SW3550", "GE3550B", "GE3550A",
                "PS3550", "NM3550", "EU3550", "ISE3550", "INM3550",
            ]),
        },
    ]
}

fn default_code_aliases() -> BTreeMap<String, String> {
    BTreeMap::from([("PH2216 / GEK2031".to_string(), "GEK2031".to_string())])
}

/// The serialised versions of the rules.
/// This allows for future changes to the file format without breaking
/// existing rules files.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_restricted")]
        restricted: Vec<String>,

        #[serde(default = "default_prerequisite_exceptions")]
        prerequisite_exceptions: Vec<PrerequisiteException>,

        #[serde(default = "default_equivalence_groups")]
        equivalence_groups: BTreeMap<ModuleCode, Vec<ModuleCode>>,

        #[serde(default = "default_manual_preclusions")]
        manual_preclusions: BTreeMap<String, Vec<ModuleCode>>,

        #[serde(default = "default_preclusion_groups")]
        preclusion_groups: Vec<PreclusionGroup>,

        #[serde(default = "default_code_aliases")]
        code_aliases: BTreeMap<String, String>,
    },
}

impl From<Versions> for Rules {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                restricted,
                prerequisite_exceptions,
                equivalence_groups,
                manual_preclusions,
                preclusion_groups,
                code_aliases,
            } => Self {
                restricted,
                prerequisite_exceptions,
                equivalence_groups,
                manual_preclusions,
                preclusion_groups,
                code_aliases,
            },
        }
    }
}

impl From<Rules> for Versions {
    fn from(rules: Rules) -> Self {
        Self::V1 {
            restricted: rules.restricted,
            prerequisite_exceptions: rules.prerequisite_exceptions,
            equivalence_groups: rules.equivalence_groups,
            manual_preclusions: rules.manual_preclusions,
            preclusion_groups: rules.preclusion_groups,
            code_aliases: rules.code_aliases,
        }
    }
}
