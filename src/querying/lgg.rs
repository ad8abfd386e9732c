//! Verification query synthesis by least general generalization
//!
//! Every statement yields three candidate patterns, one per position turned
//! into a variable. Candidates sharing the same fixed positions are merged,
//! remembering which statements they cover and which term each statement
//! puts in the open position (the candidate's answers).
//!
//! Candidates are taken greedily by descending coverage, ties broken by
//! descending textual form. A candidate is accepted only when none of its
//! statements is covered yet. Accepted patterns with the same answer set
//! share a variable and form one conjunctive group; groups are combined by
//! union. Selection stops once at least half of the statements are covered.

use crate::core::Statement;
use oxigraph::model::Term;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

/// Position replaced by a variable
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    Subject,
    Predicate,
    Object,
}

/// A statement with exactly one open position
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PatternShape {
    pub open: Position,
    /// Subject, predicate, object; `None` at the open position
    pub terms: [Option<Term>; 3],
}

impl PatternShape {
    fn from_statement(statement: &Statement, open: Position) -> (Self, Term) {
        let subject = Term::from(statement.subject.clone());
        let predicate = Term::from(statement.predicate.clone());
        let object = statement.object.clone();
        let (terms, answer) = match open {
            Position::Subject => ([None, Some(predicate), Some(object)], subject),
            Position::Predicate => ([Some(subject), None, Some(object)], predicate),
            Position::Object => ([Some(subject), Some(predicate), None], object),
        };
        (Self { open, terms }, answer)
    }
}

impl fmt::Display for PatternShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .terms
            .iter()
            .map(|t| t.as_ref().map_or_else(|| "?".to_string(), Term::to_string))
            .collect();
        write!(f, "{} {} {}", parts[0], parts[1], parts[2])
    }
}

/// An accepted pattern and the statements it accounts for
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneralizedPattern {
    pub shape: PatternShape,
    pub variable: String,
    /// Indexes into the synthesized statement slice
    pub covers: BTreeSet<usize>,
}

/// Patterns sharing one variable; evaluated as a conjunction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternGroup {
    pub variable: String,
    pub patterns: Vec<GeneralizedPattern>,
}

/// Result of a synthesis run; groups are alternatives (union)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatternSet {
    pub groups: Vec<PatternGroup>,
    pub total_statements: usize,
    pub covered: BTreeSet<usize>,
}

impl PatternSet {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn pattern_count(&self) -> usize {
        self.groups.iter().map(|g| g.patterns.len()).sum()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &GeneralizedPattern> {
        self.groups.iter().flat_map(|g| g.patterns.iter())
    }

    /// Projected variables in allocation order
    pub fn variables(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.variable.as_str()).collect()
    }

    /// Minimum number of statements a finished set must cover
    pub fn threshold(&self) -> usize {
        self.total_statements.div_ceil(2)
    }
}

struct Candidate {
    shape: PatternShape,
    label: String,
    answers: BTreeMap<usize, Term>,
}

/// Run the greedy LGG selection over `statements`.
pub fn synthesize(statements: &[Statement]) -> PatternSet {
    let total = statements.len();
    let mut set = PatternSet { total_statements: total, ..PatternSet::default() };
    if total == 0 {
        return set;
    }
    let threshold = set.threshold();

    let mut candidates: HashMap<PatternShape, BTreeMap<usize, Term>> = HashMap::new();
    for (id, statement) in statements.iter().enumerate() {
        for open in [Position::Subject, Position::Predicate, Position::Object] {
            let (shape, answer) = PatternShape::from_statement(statement, open);
            candidates.entry(shape).or_default().insert(id, answer);
        }
    }

    let mut ordered: Vec<Candidate> = candidates
        .into_iter()
        .map(|(shape, answers)| Candidate { label: shape.to_string(), shape, answers })
        .collect();
    ordered.sort_by(|a, b| {
        b.answers.len().cmp(&a.answers.len()).then_with(|| b.label.cmp(&a.label))
    });

    let mut variables: Vec<(HashSet<Term>, String)> = Vec::new();
    let mut group_of: HashMap<String, usize> = HashMap::new();

    for candidate in ordered {
        if set.covered.len() >= threshold {
            break;
        }
        if candidate.answers.keys().any(|id| set.covered.contains(id)) {
            continue;
        }

        let answers: HashSet<Term> = candidate.answers.values().cloned().collect();
        let variable = match variables.iter().find(|(known, _)| *known == answers) {
            Some((_, name)) => name.clone(),
            None => {
                let name = format!("x{}", variables.len());
                variables.push((answers, name.clone()));
                name
            }
        };

        let covers: BTreeSet<usize> = candidate.answers.keys().copied().collect();
        set.covered.extend(covers.iter().copied());

        let pattern = GeneralizedPattern { shape: candidate.shape, variable: variable.clone(), covers };
        let index = *group_of.entry(variable.clone()).or_insert_with(|| {
            set.groups.push(PatternGroup { variable: variable.clone(), patterns: Vec::new() });
            set.groups.len() - 1
        });
        set.groups[index].patterns.push(pattern);
    }

    log::debug!(
        "Synthesized {} pattern(s) in {} group(s) covering {}/{} statements",
        set.pattern_count(),
        set.groups.len(),
        set.covered.len(),
        total
    );
    set
}
