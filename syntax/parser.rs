//! Build a [`DatalogTask`] from a token stream.
//!
//! The grammar is flat: atoms never nest, so the parser is a small state
//! machine over a depth of 0 (between atoms) or 1 (inside an argument list)
//! rather than a combinator grammar.

use std::mem;

use thiserror::Error;

use relaxer_tracer::{trace, Trace};

use crate::lexer::{DatalogLexer, DatalogToken, Lex as _, Token};
use crate::role::{type_predicate_name, Role, COUNTED_PREFIX};
use crate::task::{Atom, DatalogTask, MutexElement, MutexGroup, MutexPar, Rule, TaskError, Term};

/// Things that may go wrong while reading a task.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected `{found}` at byte {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("malformed mutex variable name `{0}`")]
    MalformedMutexVarName(String),
    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Parse a complete task.
pub fn parse(input: &str) -> Result<DatalogTask, ParseError> {
    DatalogParser::new(Trace::none()).parse(input)
}

/// Statement-at-a-time parser state.
pub struct DatalogParser {
    task: DatalogTask,
    trace: Trace,
    in_args: bool,
    buffer: String,
    predicate: Option<String>,
    args: Vec<String>,
    atoms: Vec<Atom>,
    is_rule: bool,
}

impl DatalogParser {
    pub fn new(trace: Trace) -> Self {
        Self {
            task: DatalogTask::new(),
            trace,
            in_args: false,
            buffer: String::new(),
            predicate: None,
            args: Vec::new(),
            atoms: Vec::new(),
            is_rule: false,
        }
    }

    pub fn parse(mut self, input: &str) -> Result<DatalogTask, ParseError> {
        let (rest, tokens) = DatalogLexer::lex(input).map_err(|_| ParseError::UnexpectedEof)?;
        if let Some(found) = rest.chars().find(|c| !c.is_whitespace()) {
            return Err(ParseError::UnexpectedChar {
                found,
                offset: input.len() - rest.len(),
            });
        }
        for token in &tokens {
            self.step(token, input.len() - token.source.len())?;
        }
        if self.in_args
            || self.is_rule
            || self.predicate.is_some()
            || !self.buffer.is_empty()
            || !self.atoms.is_empty()
        {
            return Err(ParseError::UnexpectedEof);
        }
        trace!(
            self.trace,
            Parse,
            "Parsed {} predicates, {} facts, {} rules, {} mutex groups",
            self.task.predicate_count(),
            self.task.init.len(),
            self.task.rules.len(),
            self.task.mutex_groups.len(),
        );
        self.task.validate()?;
        Ok(self.task)
    }

    fn step(&mut self, token: &Token<DatalogToken, &str>, offset: usize) -> Result<(), ParseError> {
        use DatalogToken::*;

        let unexpected = || ParseError::UnexpectedChar {
            found: token.token.first_char(),
            offset,
        };
        match &token.token {
            Text(s) => self.buffer.push_str(s),
            LParen => {
                if self.in_args || self.buffer.is_empty() {
                    return Err(unexpected());
                }
                self.in_args = true;
                self.predicate = Some(mem::take(&mut self.buffer));
            }
            RParen => {
                if !self.in_args {
                    return Err(unexpected());
                }
                self.in_args = false;
                self.push_arg();
            }
            Comma => {
                if self.in_args {
                    self.push_arg();
                } else {
                    self.push_atom()?;
                }
            }
            If => {
                if self.in_args || self.is_rule {
                    return Err(unexpected());
                }
                self.push_atom()?;
                if self.atoms.len() != 1 {
                    return Err(unexpected());
                }
                self.is_rule = true;
            }
            Dot => {
                if self.in_args {
                    return Err(unexpected());
                }
                self.push_atom()?;
                self.end_statement().map_err(|e| match e {
                    ParseError::UnexpectedEof => unexpected(),
                    e => e,
                })?;
            }
        }
        Ok(())
    }

    fn push_arg(&mut self) {
        let arg = mem::take(&mut self.buffer);
        if !arg.is_empty() {
            self.args.push(arg);
        }
    }

    /// Finish the current atom, if there is one.
    fn push_atom(&mut self) -> Result<(), ParseError> {
        let name = match self.predicate.take() {
            Some(name) => name,
            None => mem::take(&mut self.buffer),
        };
        if name.is_empty() {
            return Ok(());
        }
        let predicate = self.task.intern_predicate(&name, self.args.len())?;
        let args = mem::take(&mut self.args)
            .iter()
            .map(|arg| self.task.intern_term(arg))
            .collect::<Vec<_>>();
        self.atoms.push(Atom::new(predicate, args));
        Ok(())
    }

    /// Classify the finished statement as a fact, a rule, or a mutex group.
    fn end_statement(&mut self) -> Result<(), ParseError> {
        let mut atoms = mem::take(&mut self.atoms).into_iter();
        let is_rule = mem::take(&mut self.is_rule);
        let head = atoms.next().ok_or(ParseError::UnexpectedEof)?;
        let role = self.task.role(head.predicate);
        if is_rule || role == Role::Activation {
            let rule = Rule::new(head, atoms);
            if let Role::MutexDefinition { unique } = role {
                let group = self.mutex_group(&rule, unique)?;
                self.task.mutex_groups.push(group);
            } else {
                self.task.rules.push(rule);
            }
        } else {
            if atoms.next().is_some() {
                return Err(ParseError::UnexpectedEof);
            }
            self.task.init.push(head);
        }
        Ok(())
    }

    /// Convert a `mutexpred[_unique] :- ...` rule into a mutex group.
    fn mutex_group(&self, rule: &Rule, unique: bool) -> Result<MutexGroup, ParseError> {
        let elements = rule
            .body
            .iter()
            .map(|atom| {
                let pars = atom
                    .args
                    .iter()
                    .map(|arg| match arg {
                        Term::Constant(c) => Ok(MutexPar::Constant(*c)),
                        Term::Variable(v) => self.mutex_par(&self.task.variable(*v).name),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(MutexElement {
                    predicate: atom.predicate,
                    pars,
                })
            })
            .collect::<Result<Vec<_>, ParseError>>()?;
        trace!(
            self.trace,
            Parse,
            "Mutex group {} with {} elements{}",
            self.task.mutex_groups.len(),
            elements.len(),
            if unique { " (unique)" } else { "" },
        );
        Ok(MutexGroup { elements, unique })
    }

    /// Decode `Var_<kind>_<number>_<type>`.
    fn mutex_par(&self, name: &str) -> Result<MutexPar, ParseError> {
        let malformed = || ParseError::MalformedMutexVarName(name.to_owned());
        let mut fields = name.splitn(4, '_').skip(2);
        let number = fields
            .next()
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(malformed)?;
        let type_name = fields.next().ok_or_else(malformed)?;
        let domain = self.task.type_predicate(type_name).ok_or_else(|| {
            TaskError::UnresolvedPredicate {
                name: type_predicate_name(type_name),
            }
        })?;
        Ok(MutexPar::Variable {
            number,
            counted: name.starts_with(COUNTED_PREFIX),
            domain,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn facts_and_rules() {
        let task = parse("p(a,b).\nq(Var_X) :- p(Var_X,b).").unwrap();
        assert_eq!(task.init.len(), 1);
        assert_eq!(task.rules.len(), 1);
        let p = task.lookup_predicate("p").unwrap();
        let q = task.lookup_predicate("q").unwrap();
        assert_eq!(task.arity(p), 2);
        assert_eq!(task.rules[0].head.predicate, q);
        assert_eq!(task.rules[0].body[0].predicate, p);
        assert!(task.rules[0].head.args[0].is_variable());
        assert_eq!(task.rules[0].body[0].args[1], task.init[0].args[1]);
    }

    #[test]
    fn zero_arity() {
        let task = parse("p().\nq :- p.\nr():-p(),q().").unwrap();
        assert_eq!(task.init.len(), 1);
        assert_eq!(task.rules.len(), 2);
        assert_eq!(task.rules[1].body.len(), 2);
    }

    #[test]
    fn activation_is_rule() {
        let task = parse("activate_pred_on().\non(a) :- activate_pred_on().").unwrap();
        assert!(task.init.is_empty());
        assert_eq!(task.rules.len(), 2);
        assert!(task.rules[0].body.is_empty());
    }

    #[test]
    fn empty_body_rule() {
        let task = parse("activate_pred_x():-.").unwrap();
        assert_eq!(task.rules.len(), 1);
        assert!(task.rules[0].body.is_empty());
    }

    #[test]
    fn shadows_resolved() {
        let task = parse("q(a) :- addpred_on(a,b), delpred_on__guaranteed(a,b).").unwrap();
        let on = task.lookup_predicate("on").unwrap();
        let add = task.lookup_predicate("addpred_on").unwrap();
        let del = task.lookup_predicate("delpred_on__guaranteed").unwrap();
        assert_eq!(task.arity(on), 2);
        assert_eq!(task.shadowed(add).map(|(_, o)| o), Some(on));
        assert_eq!(task.shadowed(del).map(|(_, o)| o), Some(on));
    }

    #[test]
    fn mutex_groups() {
        let task = parse(
            "pddl_type_block(a).\n\
             mutexpred_unique :- on(Var_enumerated_0_block, Var_counted_1_block), clear(c).\n\
             mutexpred :- holding(Var_counted_2_block).",
        )
        .unwrap();
        assert!(task.rules.is_empty());
        assert_eq!(task.mutex_groups.len(), 2);
        let block = task.type_predicate("block").unwrap();
        let group = &task.mutex_groups[0];
        assert!(group.unique);
        assert_eq!(
            group.elements[0].pars,
            vec![
                MutexPar::Variable {
                    number: 0,
                    counted: false,
                    domain: block
                },
                MutexPar::Variable {
                    number: 1,
                    counted: true,
                    domain: block
                },
            ]
        );
        assert!(matches!(group.elements[1].pars[0], MutexPar::Constant(_)));
        assert!(!task.mutex_groups[1].unique);
    }

    #[test]
    fn malformed_mutex_var() {
        assert_eq!(
            parse("pddl_type_block(a). mutexpred :- on(Var_X).").unwrap_err(),
            ParseError::MalformedMutexVarName("Var_X".into())
        );
        assert_eq!(
            parse("pddl_type_block(a). mutexpred :- on(Var_counted_x_block).").unwrap_err(),
            ParseError::MalformedMutexVarName("Var_counted_x_block".into())
        );
        assert_eq!(
            parse("mutexpred :- on(Var_counted_0_block).").unwrap_err(),
            ParseError::Task(TaskError::UnresolvedPredicate {
                name: "pddl_type_block".into()
            })
        );
    }

    #[test]
    fn errors() {
        assert_eq!(parse("p(a"), Err(ParseError::UnexpectedEof));
        assert_eq!(parse("p(a)"), Err(ParseError::UnexpectedEof));
        assert_eq!(parse("q :- p"), Err(ParseError::UnexpectedEof));
        assert_eq!(
            parse("p(a(b))."),
            Err(ParseError::UnexpectedChar {
                found: '(',
                offset: 3
            })
        );
        assert_eq!(
            parse("p)."),
            Err(ParseError::UnexpectedChar {
                found: ')',
                offset: 1
            })
        );
        assert_eq!(
            parse("p, q."),
            Err(ParseError::UnexpectedChar {
                found: '.',
                offset: 4
            })
        );
        assert!(matches!(
            parse("p(a). p(a,b)."),
            Err(ParseError::Task(TaskError::ArityMismatch { .. }))
        ));
    }

    #[test]
    fn whitespace() {
        let spaced = parse(" p ( a , b ) .\n q ( Var_X ) :- \n p ( Var_X , b ) . ").unwrap();
        let dense = parse("p(a,b).q(Var_X):-p(Var_X,b).").unwrap();
        assert_eq!(spaced, dense);
    }
}
