use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Invalid selection string '{input}': {reason}")]
    Syntax { input: String, reason: String },
    #[error("Invalid range '{0}': the start must not exceed the end")]
    InvalidRange(String),
    #[error("Invalid name pattern '{0}'")]
    InvalidPattern(String),
}

/// A single element of a comma separated selection list.
#[derive(Debug, Clone)]
enum Token {
    Number(i64),
    Range(i64, i64),
    Pattern { source: String, regex: Regex },
}

impl Token {
    fn matches_number(&self, number: i64) -> bool {
        match self {
            Token::Number(n) => *n == number,
            Token::Range(start, end) => (*start..=*end).contains(&number),
            Token::Pattern { .. } => false,
        }
    }

    fn matches_name(&self, name: &str) -> bool {
        match self {
            Token::Pattern { regex, .. } => regex.is_match(name),
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Range(a, b) => write!(f, "{a}-{b}"),
            Token::Pattern { source, .. } => write!(f, "{source}"),
        }
    }
}

/// Compiles a name pattern where `*` matches any run of characters into an anchored regex.
pub(crate) fn wildcard_regex(pattern: &str) -> Result<Regex, SelectionError> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$")).map_err(|_| SelectionError::InvalidPattern(pattern.into()))
}

fn parse_range(element: &str) -> Option<(i64, i64)> {
    // The separator is the first '-' that is not a leading sign.
    let split = element
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '-')
        .map(|(i, _)| i)?;
    let start = element[..split].trim().parse().ok()?;
    let end = element[split + 1..].trim().parse().ok()?;
    Some((start, end))
}

fn parse_list(list: &str, numeric: bool, input: &str) -> Result<Vec<Token>, SelectionError> {
    if list.trim().is_empty() {
        return Ok(Vec::new());
    }
    list.split(',')
        .map(|element| {
            let element = element.trim();
            if element.is_empty() {
                return Err(SelectionError::Syntax {
                    input: input.into(),
                    reason: "empty list element".into(),
                });
            }
            if numeric {
                if let Ok(number) = element.parse::<i64>() {
                    return Ok(Token::Number(number));
                }
                if let Some((start, end)) = parse_range(element) {
                    if start > end {
                        return Err(SelectionError::InvalidRange(element.into()));
                    }
                    return Ok(Token::Range(start, end));
                }
            }
            Ok(Token::Pattern {
                source: element.to_string(),
                regex: wildcard_regex(element)?,
            })
        })
        .collect()
}

/// The `#mol:res@atom` part of a selection, without boolean operators.
#[derive(Debug, Clone, Default)]
pub struct SimpleSelection {
    molecules: Vec<Token>,
    residues: Vec<Token>,
    atoms: Vec<Token>,
}

fn matches(tokens: &[Token], number: Option<i64>, name: Option<&str>) -> bool {
    tokens.is_empty()
        || tokens.iter().any(|t| {
            number.is_some_and(|n| t.matches_number(n)) || name.is_some_and(|s| t.matches_name(s))
        })
}

impl SimpleSelection {
    fn parse(input: &str, full_input: &str) -> Result<Self, SelectionError> {
        let syntax = |reason: &str| SelectionError::Syntax {
            input: full_input.into(),
            reason: reason.into(),
        };

        let text = input.trim();
        if text.is_empty() {
            return Ok(Self::default());
        }

        let markers = ['#', ':', '@'];
        let mut parts: [Option<&str>; 3] = [None, None, None];
        let mut last_marker: Option<usize> = None;
        let mut rest = text;

        if !rest.starts_with(markers) {
            return Err(syntax("a selection must start with '#', ':' or '@'"));
        }
        while !rest.is_empty() {
            let marker = rest.chars().next().unwrap_or('#');
            let slot = markers
                .iter()
                .position(|m| *m == marker)
                .ok_or_else(|| syntax("unexpected character"))?;
            if last_marker.is_some_and(|last| slot <= last) {
                return Err(syntax("'#', ':' and '@' must each appear once and in order"));
            }
            let body = &rest[1..];
            let end = body.find(markers).unwrap_or(body.len());
            parts[slot] = Some(&body[..end]);
            last_marker = Some(slot);
            rest = &body[end..];
        }

        Ok(Self {
            molecules: parse_list(parts[0].unwrap_or(""), false, full_input)?,
            residues: parse_list(parts[1].unwrap_or(""), true, full_input)?,
            atoms: parse_list(parts[2].unwrap_or(""), true, full_input)?,
        })
    }

    fn contains_mol(&self, mol: Option<&str>) -> bool {
        matches(&self.molecules, None, mol)
    }

    fn contains_res(&self, res_num: Option<i32>, res_name: Option<&str>, mol: Option<&str>) -> bool {
        self.contains_mol(mol) && matches(&self.residues, res_num.map(i64::from), res_name)
    }

    fn contains_atom(
        &self,
        atom_num: Option<u32>,
        atom_name: Option<&str>,
        res_num: Option<i32>,
        res_name: Option<&str>,
        mol: Option<&str>,
    ) -> bool {
        self.contains_res(res_num, res_name, mol)
            && matches(&self.atoms, atom_num.map(i64::from), atom_name)
    }
}

/// A parsed atom selection such as `#prot:1-10&@CA` or `:ASP|:GLU@O*`.
///
/// Molecules are matched by name, residues and atoms by number, range or name pattern.
/// `&` and `|` combine selections and group to the left. An empty string selects
/// everything.
#[derive(Debug, Clone)]
pub enum AtomSelection {
    Simple(SimpleSelection),
    Union(Box<AtomSelection>, Box<AtomSelection>),
    Intersection(Box<AtomSelection>, Box<AtomSelection>),
}

impl Default for AtomSelection {
    fn default() -> Self {
        AtomSelection::Simple(SimpleSelection::default())
    }
}

impl AtomSelection {
    pub fn all() -> Self {
        Self::default()
    }

    fn parse_with(input: &str, full_input: &str) -> Result<Self, SelectionError> {
        let and_index = input.rfind('&');
        let or_index = input.rfind('|');
        let split = match (and_index, or_index) {
            (None, None) => None,
            (Some(a), None) => Some((a, true)),
            (None, Some(o)) => Some((o, false)),
            (Some(a), Some(o)) => Some(if a > o { (a, true) } else { (o, false) }),
        };

        match split {
            None => Ok(AtomSelection::Simple(SimpleSelection::parse(input, full_input)?)),
            Some((index, is_and)) => {
                let (left, right) = (&input[..index], &input[index + 1..]);
                if left.trim().is_empty() || right.trim().is_empty() {
                    return Err(SelectionError::Syntax {
                        input: full_input.into(),
                        reason: "boolean operator is missing an operand".into(),
                    });
                }
                let left = Box::new(Self::parse_with(left, full_input)?);
                let right = Box::new(Self::parse_with(right, full_input)?);
                Ok(if is_and {
                    AtomSelection::Intersection(left, right)
                } else {
                    AtomSelection::Union(left, right)
                })
            }
        }
    }

    pub fn contains_mol(&self, mol: Option<&str>) -> bool {
        match self {
            AtomSelection::Simple(s) => s.contains_mol(mol),
            AtomSelection::Union(a, b) => a.contains_mol(mol) || b.contains_mol(mol),
            AtomSelection::Intersection(a, b) => a.contains_mol(mol) && b.contains_mol(mol),
        }
    }

    pub fn contains_res(&self, res_num: Option<i32>, res_name: Option<&str>, mol: Option<&str>) -> bool {
        match self {
            AtomSelection::Simple(s) => s.contains_res(res_num, res_name, mol),
            AtomSelection::Union(a, b) => {
                a.contains_res(res_num, res_name, mol) || b.contains_res(res_num, res_name, mol)
            }
            AtomSelection::Intersection(a, b) => {
                a.contains_res(res_num, res_name, mol) && b.contains_res(res_num, res_name, mol)
            }
        }
    }

    pub fn contains_atom(
        &self,
        atom_num: Option<u32>,
        atom_name: Option<&str>,
        res_num: Option<i32>,
        res_name: Option<&str>,
        mol: Option<&str>,
    ) -> bool {
        match self {
            AtomSelection::Simple(s) => s.contains_atom(atom_num, atom_name, res_num, res_name, mol),
            AtomSelection::Union(a, b) => {
                a.contains_atom(atom_num, atom_name, res_num, res_name, mol)
                    || b.contains_atom(atom_num, atom_name, res_num, res_name, mol)
            }
            AtomSelection::Intersection(a, b) => {
                a.contains_atom(atom_num, atom_name, res_num, res_name, mol)
                    && b.contains_atom(atom_num, atom_name, res_num, res_name, mol)
            }
        }
    }
}

impl FromStr for AtomSelection {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with(s, s)
    }
}

impl fmt::Display for SimpleSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |tokens: &[Token]| {
            tokens
                .iter()
                .map(Token::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        if !self.molecules.is_empty() {
            write!(f, "#{}", join(&self.molecules))?;
        }
        if !self.residues.is_empty() {
            write!(f, ":{}", join(&self.residues))?;
        }
        if !self.atoms.is_empty() {
            write!(f, "@{}", join(&self.atoms))?;
        }
        Ok(())
    }
}

impl fmt::Display for AtomSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomSelection::Simple(s) => write!(f, "{s}"),
            AtomSelection::Union(a, b) => write!(f, "{a}|{b}"),
            AtomSelection::Intersection(a, b) => write!(f, "{a}&{b}"),
        }
    }
}
