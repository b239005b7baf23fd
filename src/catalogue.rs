//! A whole module catalogue
//!
//! The [`Catalogue`] runs the pipeline over every module record in two
//! phases. [`Catalogue::parse`] parses every prerequisite and preclusion
//! independently, in parallel. [`Catalogue::link`] then builds dependency
//! trees and inverts them, which needs every module's parsed prerequisite to
//! be available. The phases are separate types, so trees can never be built
//! from a partially parsed catalogue.

use std::collections::{HashMap, HashSet};

use petgraph::{algo::tarjan_scc, graphmap::DiGraphMap};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    dependency::{DependencyTree, LockedModules},
    domain::{Expression, Rules, module_code},
    parser::parse_prerequisite,
    preclusion::{Preclusions, resolve_module_preclusions},
};

/// Output fields that are rebuilt on every run and ignored on input.
const DERIVED_FIELDS: [&str; 3] = ["ParsedPrerequisite", "ModmavenTree", "LockedModules"];

/// A module as supplied by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModuleRecord {
    /// The module's code.
    pub module_code: String,

    /// Free-text prerequisite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequisite: Option<String>,

    /// Free-text preclusion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preclusion: Option<String>,

    /// Every other field, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ModuleRecord {
    /// A record with only a code.
    #[must_use]
    pub fn new(module_code: impl Into<String>) -> Self {
        Self {
            module_code: module_code.into(),
            prerequisite: None,
            preclusion: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Sets the prerequisite text.
    #[must_use]
    pub fn with_prerequisite(mut self, text: impl Into<String>) -> Self {
        self.prerequisite = Some(text.into());
        self
    }

    /// Sets the preclusion text.
    #[must_use]
    pub fn with_preclusion(mut self, text: impl Into<String>) -> Self {
        self.preclusion = Some(text.into());
        self
    }

    fn canonicalise(mut self, rules: &Rules) -> Self {
        let canonical = rules.canonical_code(&self.module_code);
        if canonical != self.module_code {
            self.module_code = canonical.to_string();
        }
        for field in DERIVED_FIELDS {
            self.extra.remove(field);
        }
        self
    }
}

/// A module record augmented with everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessedModule {
    /// The module's (canonical) code.
    pub module_code: String,

    /// The original prerequisite text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prerequisite: Option<String>,

    /// The parsed prerequisite, present only when it says more than the
    /// original text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_prerequisite: Option<Expression>,

    /// The resolved preclusions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preclusion: Option<Preclusions>,

    /// Everything this module requires.
    pub modmaven_tree: DependencyTree,

    /// The modules that require this one directly.
    pub locked_modules: Vec<String>,

    /// Every other input field, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Catalogue state after the parse phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed;

/// Catalogue state after dependency trees have been built and inverted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Linked {
    trees: HashMap<String, DependencyTree>,
    locked: LockedModules,
}

/// Every module record, with the results of each processing phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalogue<S> {
    /// Records in input order, duplicates included.
    records: Vec<ModuleRecord>,

    /// Distinct module codes in order of first appearance.
    order: Vec<String>,

    /// The same codes, for membership tests.
    known: HashSet<String>,

    /// Parsed prerequisite of every module that has one.
    prerequisites: HashMap<String, Expression>,

    /// Resolved preclusions of every module that has any.
    preclusions: HashMap<String, Preclusions>,

    state: S,
}

struct ParsedModule {
    code: String,
    prerequisite: Option<Expression>,
    preclusions: Option<Preclusions>,
}

impl ParsedModule {
    fn new(record: &ModuleRecord, rules: &Rules) -> Self {
        let code = record.module_code.as_str();
        Self {
            code: code.to_string(),
            prerequisite: record
                .prerequisite
                .as_deref()
                .map(|text| parse_prerequisite(text, code, rules)),
            preclusions: resolve_module_preclusions(code, record.preclusion.as_deref(), rules),
        }
    }
}

impl Catalogue<Parsed> {
    /// Parses every record's prerequisite and preclusion.
    ///
    /// When several records share a code, the last one is parsed and its
    /// results are used for all of them.
    #[instrument(level = "debug", skip_all, fields(records = records.len()))]
    pub fn parse(records: Vec<ModuleRecord>, rules: &Rules) -> Self {
        let records: Vec<_> = records
            .into_iter()
            .map(|record| record.canonicalise(rules))
            .collect();

        let mut order = Vec::new();
        let mut latest: HashMap<&str, &ModuleRecord> = HashMap::with_capacity(records.len());
        for record in &records {
            if latest.insert(&record.module_code, record).is_some() {
                warn!(module = %record.module_code, "duplicate module record, using the last one");
            } else {
                order.push(record.module_code.clone());
            }
        }

        let unique: Vec<&ModuleRecord> = order
            .iter()
            .filter_map(|code| latest.get(code.as_str()).copied())
            .collect();

        let parsed: Vec<ParsedModule> = unique
            .par_iter()
            .map(|record| ParsedModule::new(record, rules))
            .collect();

        let mut prerequisites = HashMap::with_capacity(parsed.len());
        let mut preclusions = HashMap::with_capacity(parsed.len());
        for module in parsed {
            if let Some(expression) = module.prerequisite {
                prerequisites.insert(module.code.clone(), expression);
            }
            if let Some(resolved) = module.preclusions {
                preclusions.insert(module.code, resolved);
            }
        }

        let known = order.iter().cloned().collect();

        Self {
            records,
            order,
            known,
            prerequisites,
            preclusions,
            state: Parsed,
        }
    }

    /// Builds every module's dependency tree and inverts them.
    #[instrument(level = "debug", skip_all, fields(modules = self.order.len()))]
    pub fn link(self) -> Catalogue<Linked> {
        let trees: Vec<DependencyTree> = self
            .order
            .par_iter()
            .map(|code| DependencyTree::build(code, &self.prerequisites))
            .collect();

        let locked = LockedModules::invert(&trees, |code| self.known.contains(code));
        info!(
            modules = trees.len(),
            prerequisites = locked.len(),
            "linked dependency trees"
        );

        let trees = trees
            .into_iter()
            .map(|tree| (tree.name.clone(), tree))
            .collect();

        Catalogue {
            records: self.records,
            order: self.order,
            known: self.known,
            prerequisites: self.prerequisites,
            preclusions: self.preclusions,
            state: Linked { trees, locked },
        }
    }
}

impl<S> Catalogue<S> {
    /// The number of distinct modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the catalogue has no modules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether `code` is a module in this catalogue.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.known.contains(code)
    }

    /// The parsed prerequisite of `code`, if it has one.
    #[must_use]
    pub fn prerequisite(&self, code: &str) -> Option<&Expression> {
        self.prerequisites.get(code)
    }

    /// The resolved preclusions of `code`, if it has any.
    #[must_use]
    pub fn preclusions(&self, code: &str) -> Option<&Preclusions> {
        self.preclusions.get(code)
    }

    /// Modules whose prerequisite text was kept verbatim, in input order.
    pub fn opaque_prerequisites(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str).filter(|code| {
            self.prerequisites
                .get(*code)
                .is_some_and(Expression::is_opaque)
        })
    }

    /// Modules whose preclusion text yielded no codes, in input order.
    pub fn unresolved_preclusions(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str).filter(|code| {
            self.preclusions
                .get(*code)
                .is_some_and(Preclusions::is_unresolved)
        })
    }
}

impl Catalogue<Linked> {
    /// The dependency tree of `code`.
    #[must_use]
    pub fn tree(&self, code: &str) -> Option<&DependencyTree> {
        self.state.trees.get(code)
    }

    /// The modules that list `code` as an immediate prerequisite.
    #[must_use]
    pub fn locked_modules(&self, code: &str) -> &[String] {
        self.state.locked.get(code)
    }

    /// Groups of modules that require each other, directly or indirectly.
    ///
    /// Each group is sorted, as is the list of groups.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::with_capacity(self.order.len(), 0);
        for code in &self.order {
            graph.add_node(code);
            let Some(tree) = self.tree(code) else {
                continue;
            };
            for prerequisite in tree.immediate_modules() {
                if self.contains(prerequisite) {
                    graph.add_edge(code, prerequisite, ());
                }
            }
        }

        let mut cycles = Vec::new();
        for component in tarjan_scc(&graph) {
            let is_cycle = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&node| graph.contains_edge(node, node));
            if is_cycle {
                let mut codes: Vec<String> = component.into_iter().map(String::from).collect();
                codes.sort();
                cycles.push(codes);
            }
        }

        cycles.sort();
        cycles
    }

    /// Produces the augmented output record for every input record, in input
    /// order.
    #[must_use]
    pub fn process(&self) -> Vec<ProcessedModule> {
        self.records
            .iter()
            .map(|record| {
                let code = record.module_code.as_str();
                let parsed_prerequisite = record.prerequisite.as_deref().and_then(|raw| {
                    let parsed = self.prerequisite(code)?;
                    (!parsed.is_verbatim(raw) || module_code::is_single(raw))
                        .then(|| parsed.clone())
                });

                ProcessedModule {
                    module_code: record.module_code.clone(),
                    prerequisite: record.prerequisite.clone(),
                    parsed_prerequisite,
                    preclusion: self.preclusions(code).cloned(),
                    modmaven_tree: self
                        .tree(code)
                        .cloned()
                        .unwrap_or_else(|| DependencyTree::leaf(code)),
                    locked_modules: self.locked_modules(code).to_vec(),
                    extra: record.extra.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn catalogue(records: Vec<ModuleRecord>) -> Catalogue<Linked> {
        Catalogue::parse(records, &Rules::default()).link()
    }

    fn find<'a>(processed: &'a [ProcessedModule], code: &str) -> &'a ProcessedModule {
        processed
            .iter()
            .find(|module| module.module_code == code)
            .unwrap()
    }

    #[test]
    fn end_to_end() {
        let catalogue = catalogue(vec![
            ModuleRecord::new("CS1010").with_preclusion("CS1010E, CS1010S or CS1101S"),
            ModuleRecord::new("CS2040").with_prerequisite("CS1010 or its equivalent"),
            ModuleRecord::new("CS3230")
                .with_prerequisite("CS2040 and (MA1100 or CS1231)")
                .with_preclusion("Nil"),
            ModuleRecord::new("CS1231"),
        ]);
        let processed = catalogue.process();

        let cs3230 = serde_json::to_value(find(&processed, "CS3230")).unwrap();
        assert_eq!(
            cs3230,
            json!({
                "ModuleCode": "CS3230",
                "Prerequisite": "CS2040 and (MA1100 or CS1231)",
                "ParsedPrerequisite": {"and": ["CS2040", {"or": ["MA1100", "CS1231"]}]},
                "Preclusion": "Nil",
                "ModmavenTree": {
                    "name": "CS3230",
                    "children": [{
                        "name": "and",
                        "children": [
                            {
                                "name": "CS2040",
                                "children": [{"name": "CS1010", "children": []}]
                            },
                            {
                                "name": "or",
                                "children": [
                                    {"name": "MA1100", "children": []},
                                    {"name": "CS1231", "children": []}
                                ]
                            }
                        ]
                    }]
                },
                "LockedModules": []
            })
        );

        assert_eq!(find(&processed, "CS1010").locked_modules, ["CS2040"]);
        assert_eq!(find(&processed, "CS2040").locked_modules, ["CS3230"]);
        assert_eq!(find(&processed, "CS1231").locked_modules, ["CS3230"]);
        assert_eq!(
            serde_json::to_value(&find(&processed, "CS1010").preclusion).unwrap(),
            json!(["CS1010E", "CS1010S", "CS1101S"])
        );
    }

    #[test]
    fn parsed_prerequisite_only_when_informative() {
        let catalogue = catalogue(vec![
            ModuleRecord::new("CS2040").with_prerequisite("CS1010"),
            ModuleRecord::new("CS2030").with_prerequisite("CS1010 or its equivalent"),
            ModuleRecord::new("CS4248").with_prerequisite("Grade B in CS3244"),
        ]);
        let processed = catalogue.process();

        assert_eq!(
            find(&processed, "CS2040")
                .parsed_prerequisite
                .as_ref()
                .map(ToString::to_string),
            Some("CS1010".to_string())
        );
        assert!(find(&processed, "CS2030").parsed_prerequisite.is_some());
        assert!(find(&processed, "CS4248").parsed_prerequisite.is_none());
        assert_eq!(catalogue.opaque_prerequisites().collect::<Vec<_>>(), ["CS4248"]);
    }

    #[test]
    fn extra_fields_pass_through_and_derived_fields_are_rebuilt() {
        let records: Vec<ModuleRecord> = serde_json::from_value(json!([
            {
                "ModuleCode": "CS2040",
                "ModuleTitle": "Data Structures and Algorithms",
                "Prerequisite": "CS1010",
                "LockedModules": ["stale"],
                "ModmavenTree": {"name": "stale", "children": []}
            },
            {"ModuleCode": "CS1010", "ModuleCredit": "4"}
        ]))
        .unwrap();

        let processed = catalogue(records).process();
        let output = serde_json::to_value(&processed).unwrap();

        assert_eq!(output[0]["ModuleTitle"], "Data Structures and Algorithms");
        assert_eq!(output[0]["LockedModules"], json!([]));
        assert_eq!(output[0]["ModmavenTree"]["name"], "CS2040");
        assert_eq!(output[1]["ModuleCredit"], "4");
        assert_eq!(output[1]["LockedModules"], json!(["CS2040"]));
        assert!(output[1].get("Prerequisite").is_none());
    }

    #[test]
    fn aliases_are_applied_before_parsing() {
        let catalogue = catalogue(vec![
            ModuleRecord::new("PH2216 / GEK2031"),
            ModuleRecord::new("PH3201").with_prerequisite("GEK2031"),
        ]);

        assert!(catalogue.contains("GEK2031"));
        assert_eq!(catalogue.locked_modules("GEK2031"), ["PH3201"]);
    }

    #[test]
    fn duplicate_records_use_the_last_one() {
        let catalogue = catalogue(vec![
            ModuleRecord::new("CS2040").with_prerequisite("CS1010"),
            ModuleRecord::new("CS2040").with_prerequisite("CS1101S"),
            ModuleRecord::new("CS1010"),
            ModuleRecord::new("CS1101S"),
        ]);

        assert_eq!(catalogue.len(), 3);
        assert!(catalogue.locked_modules("CS1010").is_empty());
        assert_eq!(catalogue.locked_modules("CS1101S"), ["CS2040"]);
        assert_eq!(catalogue.process().len(), 4);
    }

    #[test]
    fn preclusion_groups_apply_without_text() {
        let catalogue = catalogue(vec![ModuleRecord::new("FMC1201")]);
        let processed = catalogue.process();

        let Some(Preclusions::Resolved(codes)) = &processed[0].preclusion else {
            panic!("expected group preclusions");
        };
        assert!(!codes.iter().any(|code| code.as_str() == "FMC1201"));
        assert!(codes.iter().any(|code| code.as_str() == "FMC1202"));
    }

    #[test]
    fn unresolved_preclusions_are_reported() {
        let catalogue = catalogue(vec![
            ModuleRecord::new("LL4001").with_preclusion("Students from the Faculty of Law"),
            ModuleRecord::new("CS2040").with_preclusion("CS2020"),
        ]);

        assert_eq!(catalogue.unresolved_preclusions().collect::<Vec<_>>(), ["LL4001"]);
    }

    #[test]
    fn reports_cycles() {
        let catalogue = catalogue(vec![
            ModuleRecord::new("CS2030").with_prerequisite("CS2040"),
            ModuleRecord::new("CS2040").with_prerequisite("CS2030 or CS1010"),
            ModuleRecord::new("CS1010"),
            ModuleRecord::new("MA1100").with_prerequisite("MA1100 and MA1101R"),
            ModuleRecord::new("MA1101R"),
        ]);

        assert_eq!(
            catalogue.cycles(),
            vec![vec!["CS2030".to_string(), "CS2040".to_string()]]
        );
    }
}
