//! Inductive properties of grammar nodes
//!
//! Every grammar node carries a handful of facts (FIRST set, nullability, productivity, ...)
//! that are defined inductively from the same facts of its children. This module provides the
//! cell type those facts live in.
//!
//! Shapes
//!
//!     Constant: known at construction time, no dependencies.
//!     Rule: computed from other properties by a pure function; memoized once settled.
//!     Deferred: a placeholder that yields a default until it is bound to another property.
//!         Deferred properties are what allow a grammar to refer to itself.
//!
//! Fixed points
//!
//!     Once deferred properties are bound, the dependency graph may contain cycles. Reading a
//!     property therefore computes a least fixed point by Kleene iteration: a read runs in
//!     passes, each pass recomputing every reachable rule at most once. A rule that depends on
//!     itself, directly or through others, sees its current approximation (bottom on the first
//!     pass). Passes repeat until no rule changes, and every rule visited in that last pass is
//!     settled. Settled rules are never recomputed.
//!
//!     A pass never recurses into dependencies. Reading a rule that has not been computed in the
//!     current pass records it as missing and yields its old approximation; the rule doing the
//!     reading is then parked on an explicit stack until the missing rules are done, and
//!     computed again. Grammars thousands of levels deep therefore need no call stack depth.
//!
//!     All facts are monotone over finite lattices, so iteration terminates.

use log::trace;
use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lattice contract for property values.
pub trait Fact: Clone + 'static {
    /// The least element, used as the starting approximation.
    fn bottom() -> Self;

    /// Whether `self` carries the same information as `other` for fixed-point purposes.
    fn agrees_with(&self, other: &Self) -> bool;
}

impl Fact for bool {
    fn bottom() -> Self {
        false
    }

    fn agrees_with(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T: Ord + Clone + 'static> Fact for BTreeSet<T> {
    fn bottom() -> Self {
        BTreeSet::new()
    }

    fn agrees_with(&self, other: &Self) -> bool {
        self == other
    }
}

/// Optional values only order by presence; the carried value needs no equality.
impl<V: Clone + 'static> Fact for Option<V> {
    fn bottom() -> Self {
        None
    }

    fn agrees_with(&self, other: &Self) -> bool {
        self.is_some() == other.is_some()
    }
}

// Epoch 0 is never issued, so it marks a rule that no pass has visited yet.
static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

/// Bookkeeping for one fixed-point computation.
///
/// Rules read their dependencies through [InductiveProperty::read], passing the solver along.
pub struct Solver {
    epoch: u64,
    changed: bool,
    passes: usize,
    touched: Vec<Rc<dyn Evaluate>>,
    missing: Vec<Rc<dyn Evaluate>>,
}

impl Solver {
    fn new() -> Self {
        Solver {
            epoch: 0,
            changed: false,
            passes: 0,
            touched: Vec::new(),
            missing: Vec::new(),
        }
    }

    fn begin_pass(&mut self) {
        self.epoch = NEXT_EPOCH.fetch_add(1, Ordering::Relaxed);
        self.changed = false;
        self.passes += 1;
        self.touched.clear();
        self.missing.clear();
    }

    /// Computes `root` and everything it reads, dependencies first.
    fn run(&mut self, root: Rc<dyn Evaluate>) {
        let mut stack = vec![root];
        while let Some(top) = stack.last().cloned() {
            if top.evaluate(self) {
                stack.pop();
            } else {
                stack.append(&mut self.missing);
            }
        }
    }

    fn settle(&mut self) {
        let epoch = self.epoch;
        for property in self.touched.drain(..) {
            property.settle(epoch);
        }
    }
}

impl fmt::Debug for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solver")
            .field("epoch", &self.epoch)
            .field("passes", &self.passes)
            .field("touched", &self.touched.len())
            .finish()
    }
}

trait Evaluate {
    /// Computes the rule for the current pass unless that already happened.
    ///
    /// Returns `false` when the computation read rules not yet computed in this pass. Those are
    /// left in the solver's missing list and the result is discarded.
    fn evaluate(self: Rc<Self>, solver: &mut Solver) -> bool;

    fn settle(&self, epoch: u64);
}

struct Memo<T> {
    value: T,
    epoch: u64,
    /// Computation started in `epoch` and is waiting on missing dependencies.
    active: bool,
    /// Computed in `epoch`.
    done: bool,
    settled: bool,
}

impl<T> Memo<T> {
    fn is_ready(&self, epoch: u64) -> bool {
        self.settled || (self.epoch == epoch && (self.done || self.active))
    }
}

struct Rule<T> {
    compute: Box<dyn Fn(&mut Solver) -> T>,
    memo: RefCell<Memo<T>>,
}

struct DeferredProperty<T> {
    default: T,
    target: OnceCell<InductiveProperty<T>>,
}

enum Property<T> {
    Constant(T),
    Rule(Rule<T>),
    Deferred(DeferredProperty<T>),
}

impl<T: Fact> Evaluate for Property<T> {
    fn evaluate(self: Rc<Self>, solver: &mut Solver) -> bool {
        let rule = match &*self {
            Property::Rule(rule) => rule,
            _ => return true,
        };
        {
            let mut memo = rule.memo.borrow_mut();
            if memo.settled || (memo.epoch == solver.epoch && memo.done) {
                return true;
            }
            if memo.epoch != solver.epoch {
                memo.epoch = solver.epoch;
                memo.done = false;
                solver.touched.push(self.clone());
            }
            memo.active = true;
        }

        let value = (rule.compute)(solver);
        if !solver.missing.is_empty() {
            return false;
        }

        let mut memo = rule.memo.borrow_mut();
        memo.active = false;
        memo.done = true;
        if !value.agrees_with(&memo.value) {
            solver.changed = true;
        }
        memo.value = value;
        true
    }

    fn settle(&self, epoch: u64) {
        if let Property::Rule(rule) = self {
            let mut memo = rule.memo.borrow_mut();
            if memo.epoch == epoch {
                memo.settled = true;
            }
        }
    }
}

/// A lazily computed, memoized fact about a grammar node.
///
/// Cloning is cheap and yields a handle to the same cell.
pub struct InductiveProperty<T>(Rc<Property<T>>);

impl<T> Clone for InductiveProperty<T> {
    fn clone(&self) -> Self {
        InductiveProperty(Rc::clone(&self.0))
    }
}

impl<T: Fact> InductiveProperty<T> {
    /// A property whose value is known up front.
    pub fn constant(value: T) -> Self {
        InductiveProperty(Rc::new(Property::Constant(value)))
    }

    /// A property computed from other properties.
    ///
    /// `compute` must read its dependencies with [InductiveProperty::read] using the solver it
    /// is handed, and must be monotone in them. It may run more than once per pass.
    pub fn rule(compute: impl Fn(&mut Solver) -> T + 'static) -> Self {
        InductiveProperty(Rc::new(Property::Rule(Rule {
            compute: Box::new(compute),
            memo: RefCell::new(Memo {
                value: T::bottom(),
                epoch: 0,
                active: false,
                done: false,
                settled: false,
            }),
        })))
    }

    /// A placeholder that reads as `default` until [InductiveProperty::realize] binds it.
    pub fn deferred(default: T) -> Self {
        InductiveProperty(Rc::new(Property::Deferred(DeferredProperty {
            default,
            target: OnceCell::new(),
        })))
    }

    /// Binds a deferred property so that reads forward to `actual`.
    ///
    /// Binding happens once; later calls are ignored. Calling this on a constant or rule
    /// property does nothing.
    pub fn realize(&self, actual: &InductiveProperty<T>) {
        match &*self.0 {
            Property::Deferred(deferred) => {
                // First binding wins.
                let _ = deferred.target.set(actual.clone());
            }
            _ => debug_assert!(false, "only deferred properties can be realized"),
        }
    }

    /// Whether this property is deferred and still unbound.
    pub fn is_unbound(&self) -> bool {
        matches!(&*self.0, Property::Deferred(deferred) if deferred.target.get().is_none())
    }

    /// Follows bound deferred properties to the property they stand for.
    ///
    /// # Panics
    ///
    /// If a chain of deferred properties is bound back onto itself.
    fn resolve(&self) -> &InductiveProperty<T> {
        let mut current = self;
        let mut chain: Vec<*const Property<T>> = Vec::new();
        while let Property::Deferred(deferred) = &*current.0 {
            let target = match deferred.target.get() {
                Some(target) => target,
                None => break,
            };
            let this = Rc::as_ptr(&current.0);
            assert!(!chain.contains(&this), "deferred property is bound to itself");
            chain.push(this);
            current = target;
        }
        current
    }

    /// Reads the current value, computing the fixed point if needed.
    pub fn get(&self) -> T {
        let property = self.resolve();
        let rule = match &*property.0 {
            Property::Constant(value) => return value.clone(),
            Property::Deferred(deferred) => return deferred.default.clone(),
            Property::Rule(rule) => rule,
        };

        let mut solver = Solver::new();
        loop {
            solver.begin_pass();
            solver.run(property.0.clone());
            if !solver.changed {
                trace!(
                    "property settled after {} pass(es), {} rule(s)",
                    solver.passes,
                    solver.touched.len()
                );
                solver.settle();
                return rule.memo.borrow().value.clone();
            }
        }
    }

    /// Reads the value as a dependency of a rule being computed by `solver`.
    ///
    /// A rule not yet computed in the current pass yields its previous approximation and is
    /// recorded as missing, so the reading rule will be computed again once it is done.
    pub fn read(&self, solver: &mut Solver) -> T {
        let property = self.resolve();
        match &*property.0 {
            Property::Constant(value) => value.clone(),
            Property::Deferred(deferred) => deferred.default.clone(),
            Property::Rule(rule) => {
                let memo = rule.memo.borrow();
                if !memo.is_ready(solver.epoch) {
                    solver.missing.push(property.0.clone());
                }
                memo.value.clone()
            }
        }
    }
}

impl<T> fmt::Debug for InductiveProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match &*self.0 {
            Property::Constant(_) => "constant",
            Property::Rule(rule) if rule.memo.borrow().settled => "rule (settled)",
            Property::Rule(_) => "rule",
            Property::Deferred(deferred) if deferred.target.get().is_some() => "deferred (bound)",
            Property::Deferred(_) => "deferred",
        };
        write!(f, "InductiveProperty({})", shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn set(items: &[u32]) -> BTreeSet<u32> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_constant_reads_value() {
        let property = InductiveProperty::constant(set(&[1, 2]));
        assert_eq!(property.get(), set(&[1, 2]));
    }

    #[test]
    fn test_rule_is_memoized_once_settled() {
        let calls = Rc::new(Cell::new(0));
        let dep = InductiveProperty::constant(true);
        let counter = calls.clone();
        let rule = InductiveProperty::rule(move |s| {
            counter.set(counter.get() + 1);
            !dep.read(s)
        });

        assert!(!rule.get());
        assert!(!rule.get());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_deferred_yields_default_until_bound() {
        let deferred = InductiveProperty::<BTreeSet<u32>>::deferred(BTreeSet::new());
        assert!(deferred.is_unbound());
        assert_eq!(deferred.get(), BTreeSet::new());

        deferred.realize(&InductiveProperty::constant(set(&[7])));
        assert!(!deferred.is_unbound());
        assert_eq!(deferred.get(), set(&[7]));
    }

    #[test]
    fn test_first_binding_wins() {
        let deferred = InductiveProperty::deferred(false);
        deferred.realize(&InductiveProperty::constant(true));
        deferred.realize(&InductiveProperty::constant(false));
        assert!(deferred.get());
    }

    #[test]
    fn test_mutual_cycle_reaches_least_fixed_point() {
        let a_ref = InductiveProperty::deferred(BTreeSet::new());
        let b_ref = InductiveProperty::deferred(BTreeSet::new());

        let b_for_a = b_ref.clone();
        let a = InductiveProperty::rule(move |s| {
            let mut kinds = b_for_a.read(s);
            kinds.insert(1u32);
            kinds
        });
        let a_for_b = a_ref.clone();
        let b = InductiveProperty::rule(move |s| {
            let mut kinds = a_for_b.read(s);
            kinds.insert(2u32);
            kinds
        });
        a_ref.realize(&a);
        b_ref.realize(&b);

        assert_eq!(a.get(), set(&[1, 2]));
        assert_eq!(b.get(), set(&[1, 2]));
    }

    #[test]
    fn test_self_dependency_without_base_stays_bottom() {
        let self_ref = InductiveProperty::deferred(false);
        let reader = self_ref.clone();
        let productive = InductiveProperty::rule(move |s| reader.read(s));
        self_ref.realize(&productive);

        assert!(!productive.get());
    }

    #[test]
    fn test_long_dependency_chain_is_computed_without_recursion() {
        let mut chain = vec![InductiveProperty::constant(set(&[0]))];
        for n in 1..50_000u32 {
            let previous = chain[chain.len() - 1].clone();
            chain.push(InductiveProperty::rule(move |s| {
                let mut kinds = previous.read(s);
                if n % 10_000 == 0 {
                    kinds.insert(n);
                }
                kinds
            }));
        }

        let last = chain[chain.len() - 1].clone();
        assert_eq!(last.get(), set(&[0, 10_000, 20_000, 30_000, 40_000]));
        assert!(format!("{:?}", chain[1]).contains("settled"));

        // Released from the end, so no release cascades down the chain.
        drop(last);
        while let Some(property) = chain.pop() {
            drop(property);
        }
    }

    #[test]
    fn test_rule_reading_missing_dependency_twice_is_computed_once_per_pass() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let inner = InductiveProperty::rule(move |_| {
            counter.set(counter.get() + 1);
            true
        });
        let outer = InductiveProperty::rule(move |s| inner.read(s) && inner.read(s));

        assert!(outer.get());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_optional_agrees_on_presence_only() {
        assert!(Some(1).agrees_with(&Some(2)));
        assert!(!Some(1).agrees_with(&None));
    }
}
