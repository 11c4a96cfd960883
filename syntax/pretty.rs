//! Print a task in the syntax the parser reads, followed by an optional
//! mutex-group block `< {elem, elem}:=1, ... >`.

use std::fmt;

use crate::role::type_name;
use crate::task::{Atom, DatalogTask, MutexElement, MutexGroup, MutexPar, Rule, Term};

/// Something that refers into a task, paired with that task so it can
/// print its names.
pub struct Named<'a, T: ?Sized> {
    task: &'a DatalogTask,
    item: &'a T,
}

impl DatalogTask {
    pub fn named<'a, T: ?Sized>(&'a self, item: &'a T) -> Named<'a, T> {
        Named { task: self, item }
    }

    /// Facts and rules only; this part reads back with the parser.
    pub fn program(&self) -> Program<'_> {
        Program(self)
    }

    pub fn term_name(&self, term: &Term) -> &str {
        match term {
            Term::Variable(v) => &self.variable(*v).name,
            Term::Constant(c) => &self.object(*c).name,
        }
    }
}

impl fmt::Display for Named<'_, Term> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.task.term_name(self.item))
    }
}

impl fmt::Display for Named<'_, Atom> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self
            .item
            .args
            .iter()
            .map(|arg| self.task.term_name(arg))
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{}({args})", self.task.name(self.item.predicate))
    }
}

impl fmt::Display for Named<'_, Rule> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self
            .item
            .body
            .iter()
            .map(|atom| self.task.named(atom).to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{}:-{body}", self.task.named(&self.item.head))
    }
}

impl fmt::Display for Named<'_, MutexPar> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.item {
            MutexPar::Constant(c) => f.write_str(&self.task.object(*c).name),
            MutexPar::Variable {
                number,
                counted,
                domain,
            } => {
                let domain = self.task.name(*domain);
                let kind = if *counted { 'C' } else { 'V' };
                write!(f, "{kind}{number}:{}", type_name(domain).unwrap_or(domain))
            }
        }
    }
}

impl fmt::Display for Named<'_, MutexElement> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.task.name(self.item.predicate))?;
        for par in &self.item.pars {
            write!(f, " {}", self.task.named(par))?;
        }
        Ok(())
    }
}

impl fmt::Display for Named<'_, MutexGroup> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elements = self
            .item
            .elements
            .iter()
            .map(|e| self.task.named(e).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{{{elements}}}")?;
        if self.item.unique {
            f.write_str(":=1")?;
        }
        Ok(())
    }
}

/// The facts and rules of a task.
pub struct Program<'a>(&'a DatalogTask);

impl fmt::Display for Program<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let task = self.0;
        for atom in &task.init {
            writeln!(f, "{}.", task.named(atom))?;
        }
        for rule in &task.rules {
            writeln!(f, "{}.", task.named(rule))?;
        }
        Ok(())
    }
}

impl fmt::Display for DatalogTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program())?;
        if !self.mutex_groups.is_empty() {
            let groups = self
                .mutex_groups
                .iter()
                .map(|g| format!("{}\n", self.named(g)))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "< {groups}>")?;
        }
        Ok(())
    }
}
