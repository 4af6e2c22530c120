use crate::{Condition, Connective, PredicateGroup, Where};
use datalist_core::{Error, Result};
use std::mem;

/// Which predicate tree a group belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    Where,
    Having,
}

/// A handle on a nested predicate scope.
///
/// Predicates added through the handle land inside the group, combined with
/// the group's connective. A WHERE group rejects `having` and a HAVING group
/// rejects `where_`. The group joins its parent when the handle is dropped;
/// a group left empty adds nothing.
#[derive(Debug)]
pub struct SubGroup<'a> {
    parent: &'a mut PredicateGroup,
    group: PredicateGroup,
    clause: Clause,
}

impl<'a> SubGroup<'a> {
    pub(crate) fn new(
        parent: &'a mut PredicateGroup,
        connective: Connective,
        clause: Clause,
    ) -> SubGroup<'a> {
        SubGroup {
            parent,
            group: PredicateGroup::new(connective),
            clause,
        }
    }

    pub fn clause(&self) -> Clause {
        self.clause
    }

    pub fn where_(&mut self, predicate: impl Into<Where>) -> Result<&mut Self> {
        self.expect(Clause::Where, "where")?;
        self.group.push(predicate);
        Ok(self)
    }

    pub fn where_any(
        &mut self,
        predicates: impl IntoIterator<Item = impl Into<Where>>,
    ) -> Result<&mut Self> {
        self.expect(Clause::Where, "where_any")?;
        self.group.push_any(predicates);
        Ok(self)
    }

    pub fn having(&mut self, predicate: impl Into<Where>) -> Result<&mut Self> {
        self.expect(Clause::Having, "having")?;
        self.group.push(predicate);
        Ok(self)
    }

    /// Opens a nested OR group inside this one.
    pub fn disjunctive_group(&mut self) -> SubGroup<'_> {
        SubGroup::new(&mut self.group, Connective::Or, self.clause)
    }

    /// Opens a nested AND group inside this one.
    pub fn conjunctive_group(&mut self) -> SubGroup<'_> {
        SubGroup::new(&mut self.group, Connective::And, self.clause)
    }

    pub fn is_empty(&self) -> bool {
        self.group.is_empty()
    }

    fn expect(&self, clause: Clause, method: &str) -> Result<()> {
        if self.clause == clause {
            return Ok(());
        }

        let group = match self.clause {
            Clause::Where => "WHERE",
            Clause::Having => "HAVING",
        };

        Err(Error::bad_method_call(format!(
            "Cannot call {method}() on a {group} clause group"
        )))
    }
}

impl Drop for SubGroup<'_> {
    fn drop(&mut self) {
        let connective = self.group.connective;
        let group = mem::replace(&mut self.group, PredicateGroup::new(connective));
        if !group.is_empty() {
            self.parent.push_condition(Condition::Group(group));
        }
    }
}
