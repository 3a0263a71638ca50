//! Pattern algebra and its continuation-passing compilation to the
//! instruction graph.
//!
//! Every pattern is a cheap-to-clone handle (`Rc`-backed) onto an
//! immutable tree. Structural equality/hashing (needed for Alternation
//! flattening's dedup and for any user-level pattern caching) requires
//! the input value type `V` and capture-key type `K` to be `Eq + Hash`;
//! that is the one nontrivial bound this module asks callers for, and
//! it is unavoidable — a pattern whose literal values can't be compared
//! has no sensible notion of two patterns being "the same".

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use itertools::Itertools;

use crate::error::{BuildError, Result};
use crate::instr::{self, Callback, Instruction, InstrArena, MarkPosition, Predicate, SavePosition};
use crate::match_::PartialMatch;
use crate::vm::ExecHandle;

/// Priority choice of a repetition: prefer more iterations (`Greedy`)
/// or fewer (`Lazy`). Default is `Greedy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Greediness {
    #[default]
    Greedy,
    Lazy,
}

/// When a `Call` pattern's callback fires relative to the wrapped
/// pattern. Default is `After`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallMoment {
    Before,
    #[default]
    After,
}

/// Configuration knobs recognized at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Clamp applied to both `Repetition` bounds. `100` is a reasonable
    /// default for most hosts.
    pub repetition_limit: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            repetition_limit: 100,
        }
    }
}

/// A pattern-site callback, invoked at a `Call` instruction. Unlike
/// [`crate::instr::Callback`] this isn't tied to any one compiled
/// program's arena lifetime — it's universally quantified over the
/// lifetime of the `ExecHandle`/`PartialMatch` it's given, so the same
/// `Pattern` can be compiled into arenas of different lifetimes.
pub type PatternCallback<V, K> =
    Rc<dyn for<'r> Fn(&mut ExecHandle<'r, V>, &mut PartialMatch<'_, 'r, V, K>)>;

enum Node<V, K> {
    Test(Predicate<V>),
    Literal(V),
    Any,
    OneOfLiterals(Vec<V>),
    Concatenation(Vec<Pattern<V, K>>),
    Alternation(Vec<Pattern<V, K>>),
    Captured(Option<K>, Pattern<V, K>),
    Marked(Pattern<V, K>),
    Call(PatternCallback<V, K>, Pattern<V, K>, CallMoment),
    ZeroOrOne(Pattern<V, K>, Greediness),
    ZeroOrMore(Pattern<V, K>, Greediness),
    OneOrMore(Pattern<V, K>, Greediness),
    /// `max = None` means unbounded.
    Repetition(Pattern<V, K>, usize, Option<usize>, Greediness),
}

/// A declarative combinator describing a match intent. Cloning is a
/// pointer bump; the tree itself is immutable once built.
pub struct Pattern<V, K>(Rc<Node<V, K>>);

impl<V, K> Clone for Pattern<V, K> {
    fn clone(&self) -> Self {
        Pattern(Rc::clone(&self.0))
    }
}

impl<V, K> fmt::Debug for Pattern<V, K>
where
    V: fmt::Debug,
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            Node::Test(_) => write!(f, "Test(..)"),
            Node::Literal(v) => write!(f, "Literal({v:?})"),
            Node::Any => write!(f, "Any"),
            Node::OneOfLiterals(vs) => write!(f, "OneOfLiterals({vs:?})"),
            Node::Concatenation(ps) => write!(f, "Concatenation({ps:?})"),
            Node::Alternation(ps) => write!(f, "Alternation({ps:?})"),
            Node::Captured(k, p) => write!(f, "Captured({k:?}, {p:?})"),
            Node::Marked(p) => write!(f, "Marked({p:?})"),
            Node::Call(_, p, m) => write!(f, "Call(.., {p:?}, {m:?})"),
            Node::ZeroOrOne(p, g) => write!(f, "ZeroOrOne({p:?}, {g:?})"),
            Node::ZeroOrMore(p, g) => write!(f, "ZeroOrMore({p:?}, {g:?})"),
            Node::OneOrMore(p, g) => write!(f, "OneOrMore({p:?}, {g:?})"),
            Node::Repetition(p, min, max, g) => {
                write!(f, "Repetition({p:?}, {min}, {max:?}, {g:?})")
            }
        }
    }
}

/// Structural equality: tree shape plus payload equality. `Test`
/// predicates compare by identity (see [`Predicate`]); everything else
/// compares by value.
impl<V: PartialEq, K: PartialEq> PartialEq for Pattern<V, K> {
    fn eq(&self, other: &Self) -> bool {
        if Rc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        match (&*self.0, &*other.0) {
            (Node::Test(a), Node::Test(b)) => a == b,
            (Node::Literal(a), Node::Literal(b)) => a == b,
            (Node::Any, Node::Any) => true,
            (Node::OneOfLiterals(a), Node::OneOfLiterals(b)) => a == b,
            (Node::Concatenation(a), Node::Concatenation(b)) => a == b,
            (Node::Alternation(a), Node::Alternation(b)) => a == b,
            (Node::Captured(ka, a), Node::Captured(kb, b)) => ka == kb && a == b,
            (Node::Marked(a), Node::Marked(b)) => a == b,
            (Node::Call(ca, a, ma), Node::Call(cb, b, mb)) => {
                Rc::ptr_eq(ca, cb) && a == b && ma == mb
            }
            (Node::ZeroOrOne(a, ga), Node::ZeroOrOne(b, gb)) => a == b && ga == gb,
            (Node::ZeroOrMore(a, ga), Node::ZeroOrMore(b, gb)) => a == b && ga == gb,
            (Node::OneOrMore(a, ga), Node::OneOrMore(b, gb)) => a == b && ga == gb,
            (
                Node::Repetition(a, amin, amax, ga),
                Node::Repetition(b, bmin, bmax, gb),
            ) => a == b && amin == bmin && amax == bmax && ga == gb,
            _ => false,
        }
    }
}
impl<V: Eq, K: Eq> Eq for Pattern<V, K> {}

impl<V: Hash, K: Hash> Hash for Pattern<V, K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(&*self.0).hash(state);
        match &*self.0 {
            Node::Test(p) => p.hash(state),
            Node::Literal(v) => v.hash(state),
            Node::Any => {}
            Node::OneOfLiterals(vs) => vs.hash(state),
            Node::Concatenation(ps) | Node::Alternation(ps) => ps.hash(state),
            Node::Captured(k, p) => {
                k.hash(state);
                p.hash(state);
            }
            Node::Marked(p) => p.hash(state),
            Node::Call(c, p, m) => {
                (Rc::as_ptr(c) as *const () as usize).hash(state);
                p.hash(state);
                m.hash(state);
            }
            Node::ZeroOrOne(p, g) | Node::ZeroOrMore(p, g) | Node::OneOrMore(p, g) => {
                p.hash(state);
                g.hash(state);
            }
            Node::Repetition(p, min, max, g) => {
                p.hash(state);
                min.hash(state);
                max.hash(state);
                g.hash(state);
            }
        }
    }
}

impl<V, K> Pattern<V, K>
where
    V: Clone + PartialEq + Eq + Hash + 'static,
    K: Clone + PartialEq + Eq + Hash + 'static,
{
    /// Matches one value satisfying `predicate`.
    pub fn test(predicate: impl Fn(&V) -> bool + 'static) -> Self {
        Pattern(Rc::new(Node::Test(Predicate::new(predicate))))
    }

    /// `Test(x ↦ x == v)`.
    pub fn literal(value: V) -> Self {
        Pattern(Rc::new(Node::Literal(value)))
    }

    /// Matches any single value.
    pub fn any() -> Self {
        Pattern(Rc::new(Node::Any))
    }

    /// Matches any value equal to one of `values`. The set preserves
    /// first-seen insertion order and deduplicates; a single value
    /// degenerates to [`Pattern::literal`].
    pub fn one_of_literals(values: impl IntoIterator<Item = V>) -> Result<Self> {
        let deduped: Vec<V> = values.into_iter().unique().collect();
        if deduped.is_empty() {
            return Err(BuildError::EmptyArgument {
                what: "OneOfLiterals",
            });
        }
        if deduped.len() == 1 {
            return Ok(Self::literal(deduped.into_iter().next().unwrap()));
        }
        Ok(Pattern(Rc::new(Node::OneOfLiterals(deduped))))
    }

    /// Concatenates patterns in order. Nested `Concatenation`s are
    /// flattened so associativity holds and the tree has a canonical
    /// shape.
    pub fn concat(parts: impl IntoIterator<Item = Self>) -> Result<Self> {
        let flat = flatten(parts, |p| match &*p.0 {
            Node::Concatenation(inner) => Some(inner.clone()),
            _ => None,
        });
        if flat.is_empty() {
            return Err(BuildError::EmptyArgument {
                what: "Concatenation",
            });
        }
        if flat.len() == 1 {
            return Ok(flat.into_iter().next().unwrap());
        }
        Ok(Pattern(Rc::new(Node::Concatenation(flat))))
    }

    /// `self.then(other)`, a two-element [`Pattern::concat`].
    pub fn then(self, other: Self) -> Self {
        Self::concat([self, other]).expect("concat of two patterns is never empty")
    }

    /// Tries each pattern in order; the first to match wins. Nested
    /// `Alternation`s are flattened; structural duplicates are removed,
    /// preserving first-seen order.
    pub fn alt(parts: impl IntoIterator<Item = Self>) -> Result<Self> {
        let flat = flatten(parts, |p| match &*p.0 {
            Node::Alternation(inner) => Some(inner.clone()),
            _ => None,
        });
        let deduped: Vec<Self> = flat.into_iter().unique().collect();
        if deduped.is_empty() {
            return Err(BuildError::EmptyArgument {
                what: "Alternation",
            });
        }
        if deduped.len() == 1 {
            return Ok(deduped.into_iter().next().unwrap());
        }
        Ok(Pattern(Rc::new(Node::Alternation(deduped))))
    }

    /// `self.or(other)`, a two-element [`Pattern::alt`].
    pub fn or(self, other: Self) -> Self {
        Self::alt([self, other]).expect("alt of two patterns is never empty")
    }

    /// Wraps `self` in a capture under `key` (`None` for the
    /// whole-match capture).
    pub fn captured(key: Option<K>, inner: Self) -> Self {
        Pattern(Rc::new(Node::Captured(key, inner)))
    }

    /// Pushes a fresh marker around `inner`'s START, pops it at END.
    /// Nesting is allowed; markers form a stack.
    pub fn marked(inner: Self) -> Self {
        Pattern(Rc::new(Node::Marked(inner)))
    }

    /// Invokes `callback` at `moment` relative to `inner`. Default
    /// moment is [`CallMoment::After`]; see [`Pattern::call_before`].
    pub fn call(callback: PatternCallback<V, K>, inner: Self, moment: CallMoment) -> Self {
        Pattern(Rc::new(Node::Call(callback, inner, moment)))
    }

    pub fn call_after(callback: PatternCallback<V, K>, inner: Self) -> Self {
        Self::call(callback, inner, CallMoment::After)
    }

    pub fn call_before(callback: PatternCallback<V, K>, inner: Self) -> Self {
        Self::call(callback, inner, CallMoment::Before)
    }

    /// Zero or one occurrences of `inner`.
    pub fn zero_or_one(inner: Self, greediness: Greediness) -> Self {
        Pattern(Rc::new(Node::ZeroOrOne(inner, greediness)))
    }

    /// Zero or more occurrences of `inner`.
    pub fn zero_or_more(inner: Self, greediness: Greediness) -> Self {
        Pattern(Rc::new(Node::ZeroOrMore(inner, greediness)))
    }

    /// One or more occurrences of `inner`.
    pub fn one_or_more(inner: Self, greediness: Greediness) -> Self {
        Pattern(Rc::new(Node::OneOrMore(inner, greediness)))
    }

    /// Between `min` and `max` occurrences of `inner`, inclusive.
    /// `max = None` means unbounded. Bounds are clamped to the compile
    /// limit at compile time, not here — construction only rejects
    /// `min > max` when `max` is finite, rather than silently
    /// reinterpreting it.
    pub fn repetition(inner: Self, min: usize, max: Option<usize>, greediness: Greediness) -> Result<Self> {
        if let Some(max) = max {
            if min > max {
                return Err(BuildError::InvalidRepetitionBounds { min, max });
            }
        }
        Ok(Pattern(Rc::new(Node::Repetition(inner, min, max, greediness))))
    }

    /// Compiles `self` with default [`CompileOptions`] into a fresh
    /// instruction graph rooted at an `Accept` node.
    pub fn compile<'a>(&self, arena: &'a InstrArena<'a, V, K>) -> &'a Instruction<'a, V, K> {
        self.compile_with(arena, &CompileOptions::default())
    }

    pub fn compile_with<'a>(
        &self,
        arena: &'a InstrArena<'a, V, K>,
        opts: &CompileOptions,
    ) -> &'a Instruction<'a, V, K> {
        let accept = arena.accept();
        self.compile_cont(arena, accept, opts)
    }

    fn compile_cont<'a>(
        &self,
        arena: &'a InstrArena<'a, V, K>,
        next: &'a Instruction<'a, V, K>,
        opts: &CompileOptions,
    ) -> &'a Instruction<'a, V, K> {
        match &*self.0 {
            Node::Test(pred) => arena.atom(pred.clone(), next),
            Node::Literal(value) => {
                let value = value.clone();
                arena.atom(Predicate::new(move |x: &V| *x == value), next)
            }
            Node::Any => arena.atom(Predicate::new(|_: &V| true), next),
            Node::OneOfLiterals(values) => {
                let values = values.clone();
                arena.atom(Predicate::new(move |x: &V| values.contains(x)), next)
            }
            Node::Concatenation(parts) => {
                let mut cont = next;
                for part in parts.iter().rev() {
                    cont = part.compile_cont(arena, cont, opts);
                }
                cont
            }
            Node::Alternation(parts) => {
                let entries: Vec<&'a Instruction<'a, V, K>> = parts
                    .iter()
                    .map(|p| p.compile_cont(arena, next, opts))
                    .collect();
                let mut iter = entries.into_iter().rev();
                let mut acc = iter.next().expect("Alternation is never empty");
                for entry in iter {
                    acc = arena.split(entry, acc);
                }
                acc
            }
            Node::Captured(key, inner) => {
                let end = arena.save(key.clone(), SavePosition::End, next);
                let body = inner.compile_cont(arena, end, opts);
                arena.save(key.clone(), SavePosition::Start, body)
            }
            Node::Marked(inner) => {
                let end = arena.mark(MarkPosition::End, next);
                let body = inner.compile_cont(arena, end, opts);
                arena.mark(MarkPosition::Start, body)
            }
            Node::Call(callback, inner, moment) => {
                let instr_cb: Callback<'a, V, K> = wrap_callback(Rc::clone(callback));
                match moment {
                    CallMoment::Before => {
                        let body = inner.compile_cont(arena, next, opts);
                        arena.call(instr_cb, body)
                    }
                    CallMoment::After => {
                        let call_node = arena.call(instr_cb, next);
                        inner.compile_cont(arena, call_node, opts)
                    }
                }
            }
            Node::ZeroOrOne(inner, greediness) => {
                let body = inner.compile_cont(arena, next, opts);
                match greediness {
                    Greediness::Greedy => arena.split(body, next),
                    Greediness::Lazy => arena.split(next, body),
                }
            }
            Node::ZeroOrMore(inner, greediness) => {
                compile_star(arena, inner, *greediness, next, opts)
            }
            Node::OneOrMore(inner, greediness) => {
                compile_plus(arena, inner, *greediness, next, opts)
            }
            Node::Repetition(inner, min, max, greediness) => {
                compile_repetition(arena, inner, *min, *max, *greediness, next, opts)
            }
        }
    }
}

/// Flattens one level of nesting for an associative n-ary combinator
/// (`Concatenation`/`Alternation`): any direct child whose own node
/// matches `unwrap` contributes its children instead of itself.
fn flatten<V, K>(
    parts: impl IntoIterator<Item = Pattern<V, K>>,
    unwrap: impl Fn(&Pattern<V, K>) -> Option<Vec<Pattern<V, K>>>,
) -> Vec<Pattern<V, K>> {
    let mut out = Vec::new();
    for part in parts {
        match unwrap(&part) {
            Some(children) => out.extend(flatten(children, &unwrap)),
            None => out.push(part),
        }
    }
    out
}

fn wrap_callback<'a, V, K>(callback: PatternCallback<V, K>) -> Callback<'a, V, K>
where
    V: 'static,
    K: 'static,
{
    Rc::new(move |handle: &mut ExecHandle<'a, V>, partial: &mut PartialMatch<'_, 'a, V, K>| {
        (callback)(handle, partial)
    })
}

fn compile_star<'a, V, K>(
    arena: &'a InstrArena<'a, V, K>,
    body: &Pattern<V, K>,
    greediness: Greediness,
    next: &'a Instruction<'a, V, K>,
    opts: &CompileOptions,
) -> &'a Instruction<'a, V, K>
where
    V: Clone + PartialEq + Eq + Hash + 'static,
    K: Clone + PartialEq + Eq + Hash + 'static,
{
    let split = arena.split_unpatched();
    let compiled_body = body.compile_cont(arena, split, opts);
    match greediness {
        Greediness::Greedy => instr::InstrArena::patch_split(split, compiled_body, next),
        Greediness::Lazy => instr::InstrArena::patch_split(split, next, compiled_body),
    }
    split
}

fn compile_plus<'a, V, K>(
    arena: &'a InstrArena<'a, V, K>,
    body: &Pattern<V, K>,
    greediness: Greediness,
    next: &'a Instruction<'a, V, K>,
    opts: &CompileOptions,
) -> &'a Instruction<'a, V, K>
where
    V: Clone + PartialEq + Eq + Hash + 'static,
    K: Clone + PartialEq + Eq + Hash + 'static,
{
    let split = arena.split_unpatched();
    let compiled_body = body.compile_cont(arena, split, opts);
    match greediness {
        Greediness::Greedy => instr::InstrArena::patch_split(split, compiled_body, next),
        Greediness::Lazy => instr::InstrArena::patch_split(split, next, compiled_body),
    }
    compiled_body
}

/// Compiles `Repetition(p, min, max, g)`.
///
/// Both bounds are clamped to `opts.repetition_limit` (`min` further
/// clamped to `<= max` when `max` is finite); `max = None` is
/// unbounded.
fn compile_repetition<'a, V, K>(
    arena: &'a InstrArena<'a, V, K>,
    body: &Pattern<V, K>,
    min: usize,
    max: Option<usize>,
    greediness: Greediness,
    next: &'a Instruction<'a, V, K>,
    opts: &CompileOptions,
) -> &'a Instruction<'a, V, K>
where
    V: Clone + PartialEq + Eq + Hash + 'static,
    K: Clone + PartialEq + Eq + Hash + 'static,
{
    let limit = opts.repetition_limit;
    let min = min.min(limit);
    let max = max.map(|m| m.min(limit));
    let min = match max {
        Some(max) => min.min(max),
        None => min,
    };

    if max == Some(0) {
        return next;
    }

    match max {
        None => {
            if min == 0 {
                compile_star(arena, body, greediness, next, opts)
            } else {
                let mut cont = compile_star(arena, body, greediness, next, opts);
                for _ in 0..(min - 1) {
                    cont = body.compile_cont(arena, cont, opts);
                }
                body.compile_cont(arena, cont, opts)
            }
        }
        Some(max) => {
            let mut cont = next;
            for _ in 0..(max - min) {
                let inner = Pattern::zero_or_one(body.clone(), greediness);
                cont = inner.compile_cont(arena, cont, opts);
            }
            for _ in 0..min {
                cont = body.compile_cont(arena, cont, opts);
            }
            cont
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use assert_matches::assert_matches;

    use super::*;
    use crate::vm;

    // Every test compiles its own pattern into its own arena and keeps
    // both alive for the whole function body: `vm::run`'s signature ties
    // the returned `Match`'s lifetime to the compiled program's, so the
    // arena can't be hidden behind a helper that returns the match.

    #[test]
    fn concat_matches_in_order() {
        let p = Pattern::concat([Pattern::literal(1), Pattern::literal(2), Pattern::literal(3)]).unwrap();
        let arena = InstrArena::new();
        let entry = p.compile(&arena);
        assert!(vm::run(entry, &[1, 2, 3]).is_some());
        assert!(vm::run(entry, &[1, 3, 2]).is_none());
    }

    #[test]
    fn concat_flattens_nested_concatenations() {
        let inner = Pattern::concat([Pattern::literal(1), Pattern::literal(2)]).unwrap();
        let outer = Pattern::concat([inner, Pattern::literal(3)]).unwrap();
        match &*outer.0 {
            Node::Concatenation(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected a flattened 3-way Concatenation, got {other:?}"),
        }
    }

    #[test]
    fn alt_tries_first_match_in_priority_order() {
        let p = Pattern::alt([
            Pattern::captured(Some("first"), Pattern::literal(1)),
            Pattern::captured(Some("second"), Pattern::any()),
        ])
        .unwrap();
        let arena = InstrArena::new();
        let entry = p.compile(&arena);

        let m = vm::run(entry, &[1]).unwrap();
        assert!(m.group(&Some("first")).is_some());
        assert!(m.group(&Some("second")).is_none());

        let m = vm::run(entry, &[9]).unwrap();
        assert!(m.group(&Some("first")).is_none());
        assert!(m.group(&Some("second")).is_some());
    }

    #[test]
    fn alt_dedups_structurally_identical_arms() {
        let p = Pattern::alt([Pattern::literal(1), Pattern::literal(1), Pattern::literal(2)]).unwrap();
        match &*p.0 {
            Node::Alternation(parts) => assert_eq!(parts.len(), 2),
            other => panic!("expected deduped 2-way Alternation, got {other:?}"),
        }
    }

    #[test]
    fn one_of_literals_rejects_empty_and_collapses_singleton() {
        assert!(Pattern::<i32, ()>::one_of_literals(std::iter::empty()).is_err());
        let single = Pattern::one_of_literals([5]).unwrap();
        assert_matches!(&*single.0, Node::Literal(5));
    }

    #[test]
    fn greedy_one_or_more_consumes_maximally() {
        let p = Pattern::concat([
            Pattern::captured(Some("body"), Pattern::one_or_more(Pattern::literal(7), Greediness::Greedy)),
            Pattern::literal(8),
        ])
        .unwrap();
        let arena = InstrArena::new();
        let entry = p.compile(&arena);
        let values = [7, 7, 7, 8];
        let m = vm::run(entry, &values).unwrap();
        assert_eq!(m.group(&Some("body")), Some(&values[..3]));
    }

    #[test]
    fn lazy_one_or_more_consumes_minimally() {
        let p = Pattern::concat([
            Pattern::captured(Some("body"), Pattern::one_or_more(Pattern::literal(7), Greediness::Lazy)),
            Pattern::zero_or_more(Pattern::literal(7), Greediness::Greedy),
        ])
        .unwrap();
        let arena = InstrArena::new();
        let entry = p.compile(&arena);
        let values = [7, 7, 7];
        let m = vm::run(entry, &values).unwrap();
        assert_eq!(m.group(&Some("body")), Some(&values[..1]));
    }

    #[test]
    fn repetition_rejects_min_greater_than_max() {
        let err = Pattern::<i32, ()>::repetition(Pattern::literal(1), 3, Some(1), Greediness::Greedy)
            .unwrap_err();
        assert_eq!(err, BuildError::InvalidRepetitionBounds { min: 3, max: 1 });
    }

    #[test]
    fn repetition_with_max_zero_compiles_to_empty() {
        let p = Pattern::repetition(Pattern::literal(1), 0, Some(0), Greediness::Greedy).unwrap();
        let whole = Pattern::concat([p, Pattern::literal(2)]).unwrap();
        let arena = InstrArena::new();
        let entry = whole.compile(&arena);
        assert!(vm::run(entry, &[2]).is_some());
        assert!(vm::run(entry, &[1, 2]).is_none());
    }

    #[test]
    fn bounded_repetition_accepts_within_range_only() {
        let p = Pattern::repetition(Pattern::literal(9), 2, Some(3), Greediness::Greedy).unwrap();
        let arena = InstrArena::new();
        let entry = p.compile(&arena);
        assert!(vm::run(entry, &[9]).is_none());
        assert!(vm::run(entry, &[9, 9]).is_some());
        assert!(vm::run(entry, &[9, 9, 9]).is_some());
    }

    #[test]
    fn unbounded_repetition_accepts_min_or_more() {
        let p = Pattern::concat([
            Pattern::repetition(Pattern::literal(9), 2, None, Greediness::Greedy).unwrap(),
            Pattern::literal(0),
        ])
        .unwrap();
        let arena = InstrArena::new();
        let entry = p.compile(&arena);
        assert!(vm::run(entry, &[9, 0]).is_none());
        assert!(vm::run(entry, &[9, 9, 0]).is_some());
        assert!(vm::run(entry, &[9, 9, 9, 9, 0]).is_some());
    }

    #[test]
    fn call_invokes_callback_on_matching_thread() {
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let log_for_cb = Rc::clone(&log);
        let callback: PatternCallback<i32, ()> = Rc::new(move |_handle, _partial| {
            log_for_cb.borrow_mut().push("fired");
        });
        let p = Pattern::call_after(callback, Pattern::literal(1));
        let arena = InstrArena::new();
        let entry = p.compile(&arena);
        assert!(vm::run(entry, &[1]).is_some());
        assert_eq!(*log.borrow(), vec!["fired"]);
    }

    #[test]
    fn marked_regions_push_and_pop_the_marker_stack() {
        let marker_seen: Rc<RefCell<Option<bool>>> = Rc::new(RefCell::new(None));
        let marker_seen_cb = Rc::clone(&marker_seen);
        let callback: PatternCallback<i32, ()> = Rc::new(move |_handle, partial| {
            *marker_seen_cb.borrow_mut() = Some(partial.current_marker().is_some());
        });
        let p = Pattern::marked(Pattern::call_after(callback, Pattern::literal(1)));
        let arena = InstrArena::new();
        let entry = p.compile(&arena);
        assert!(vm::run(entry, &[1]).is_some());
        assert_eq!(*marker_seen.borrow(), Some(true));
    }
}
