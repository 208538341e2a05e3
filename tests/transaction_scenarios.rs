//! End-to-end transaction scenarios, driven only through the public API
//! (this file compiles as an external crate, so it never reaches for
//! `Id::from_index` or any other `pub(crate)` internal).

use flowlog_core::transaction::{data_input, run_transaction};
use flowlog_core::{
    Block, BlockId, Config, Constraint, EngineError, EvaluationContext, Field, FunctionConstraint, JoinNode, MoveConstraint, OutputNode, RawValue,
    Register, ScanConstraint, StageInput, TransactionInput,
};

fn context() -> EvaluationContext {
    EvaluationContext::with_default_config()
}

/// `edge(x,y) ^ edge(y,z) => path(x,z)`. Inserting both edges of a chain
/// in one transaction derives the hop exactly once (not once per
/// premise); retracting the middle edge in a later transaction removes
/// it again.
#[test]
fn transitive_closure_derives_and_retracts_a_hop() {
    let mut ctx = context();
    let edge = ctx.interner().borrow_mut().intern(RawValue::string("edge"));
    let path = ctx.interner().borrow_mut().intern(RawValue::string("path"));
    let rule = ctx.interner().borrow_mut().intern(RawValue::string("transitive"));

    let left = Constraint::Scan(ScanConstraint::new(Field::Register(Register(0)), Field::Static(edge), Field::Register(Register(1)), Field::Ignore));
    let right = Constraint::Scan(ScanConstraint::new(Field::Register(Register(1)), Field::Static(edge), Field::Register(Register(2)), Field::Ignore));
    let mut block = Block::new("transitive", 3, JoinNode::new(vec![left, right], 3));
    block.outputs.push((
        StageInput::Join,
        OutputNode::commit_insert(Field::Register(Register(0)), Field::Static(path), Field::Register(Register(2)), Field::Static(rule)),
    ));
    ctx.add_block(BlockId(0), block);

    let one = ctx.interner().borrow_mut().intern(RawValue::number(1.0));
    let three = ctx.interner().borrow_mut().intern(RawValue::number(3.0));

    let inputs = vec![
        data_input(RawValue::number(1.0), RawValue::string("edge"), RawValue::number(2.0), RawValue::string("ext"), 0, 1),
        data_input(RawValue::number(2.0), RawValue::string("edge"), RawValue::number(3.0), RawValue::string("ext"), 0, 1),
    ];
    run_transaction(&mut ctx, 0, inputs).unwrap();

    assert!(ctx.index().check(one, path, three, rule, 0, 0));
    // Derived exactly once, not once per premise, even though both edges
    // landed in the same batch.
    let diffs = ctx.index().get_diffs(one, path, three, rule, 0);
    assert_eq!(diffs.len(), 1);
    assert!(diffs[0] > 0);

    let retract = vec![data_input(RawValue::number(2.0), RawValue::string("edge"), RawValue::number(3.0), RawValue::string("ext"), 0, -1)];
    run_transaction(&mut ctx, 1, retract).unwrap();
    assert!(!ctx.index().check(one, path, three, rule, 2, 0));
}

/// Counting aggregate grouped by tag: two members give a count of 2,
/// retracting one member in a later transaction collapses it to 1.
#[test]
fn counting_aggregate_tracks_group_membership_across_transactions() {
    use flowlog_core::ops::aggregate::{Aggregate, Count};
    use flowlog_core::{AggregateStage, Stage};

    let mut ctx = context();
    let tag = ctx.interner().borrow_mut().intern(RawValue::string("tag"));
    let count_attr = ctx.interner().borrow_mut().intern(RawValue::string("count"));
    let rule = ctx.interner().borrow_mut().intern(RawValue::string("counter"));

    // registers: 0 = entity, 1 = tag value (the join's own registers;
    // register 2 is the aggregate's output, bound downstream of the join).
    let scan = Constraint::Scan(ScanConstraint::new(Field::Register(Register(0)), Field::Static(tag), Field::Register(Register(1)), Field::Ignore));
    let mut block = Block::new("counter", 3, JoinNode::new(vec![scan], 2));
    let aggregate: Aggregate<Count> = Aggregate::new(vec![Register(1)], vec![Register(0)], Register(0), Register(2));
    block.push_stage(Stage::Aggregate { node: AggregateStage::Count(aggregate), input: StageInput::Join });
    block.outputs.push((
        StageInput::Stage(0),
        OutputNode::commit_insert(Field::Register(Register(1)), Field::Static(count_attr), Field::Register(Register(2)), Field::Static(rule)),
    ));
    ctx.add_block(BlockId(0), block);

    let x = ctx.interner().borrow_mut().intern(RawValue::string("x"));
    let y = ctx.interner().borrow_mut().intern(RawValue::string("y"));
    let two = ctx.interner().borrow_mut().intern(RawValue::number(2.0));
    let one_count = ctx.interner().borrow_mut().intern(RawValue::number(1.0));

    let inputs = vec![
        data_input(RawValue::string("a"), RawValue::string("tag"), RawValue::string("x"), RawValue::string("ext"), 0, 1),
        data_input(RawValue::string("b"), RawValue::string("tag"), RawValue::string("x"), RawValue::string("ext"), 0, 1),
        data_input(RawValue::string("c"), RawValue::string("tag"), RawValue::string("y"), RawValue::string("ext"), 0, 1),
    ];
    run_transaction(&mut ctx, 0, inputs).unwrap();

    assert!(ctx.index().check(x, count_attr, two, rule, 1, 0));
    assert!(ctx.index().check(y, count_attr, one_count, rule, 1, 0));

    let retract = vec![data_input(RawValue::string("b"), RawValue::string("tag"), RawValue::string("x"), RawValue::string("ext"), 0, -1)];
    run_transaction(&mut ctx, 1, retract).unwrap();
    assert!(!ctx.index().check(x, count_attr, two, rule, 2, 0));
    assert!(ctx.index().check(x, count_attr, one_count, rule, 2, 0));
}

/// A choose with two branches that could both match always attributes
/// the record to the first branch whose body matches, never the second.
#[test]
fn choose_always_resolves_to_the_first_matching_branch() {
    use flowlog_core::ops::choose::Choose;
    use flowlog_core::{Interner, Prefix};

    let mut interner = Interner::new();
    let alice = interner.intern(RawValue::string("alice"));

    let mut choose = Choose::new(2, vec![Register(0)], vec![vec![Register(0)], vec![Register(0)]]);

    let mut outer = Prefix::empty(2);
    outer.bind(Register(0), alice);

    let mut branch0 = Prefix::empty(2);
    branch0.bind(Register(0), alice);
    choose.process_branch(0, branch0, 0, 1);

    let first = choose.process_outer(outer.clone(), 0, 1);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].0, 0);

    let mut branch1 = Prefix::empty(2);
    branch1.bind(Register(0), alice);
    choose.process_branch(1, branch1, 1, 1);
    let second = choose.process_outer(outer, 1, 1);
    // Branch 0 re-matching its own already-claimed key on a replayed delta
    // is expected; what the exclusivity gate guarantees is that branch 1
    // never contributes once branch 0 has claimed the key.
    assert!(second.iter().all(|(branch, _, _)| *branch != 1), "branch 1 must not fire once branch 0 already claimed this key");
}

/// Descending sort with a tie, then a new maximum: a tie does not disturb
/// the first record's rank (only the newly-arrived record is a plain
/// insert); a new maximum shifts every existing rank.
#[test]
fn descending_sort_is_stable_and_shifts_ranks_on_a_new_maximum() {
    use flowlog_core::ops::sort::{Direction, Sort, SortKey};
    use flowlog_core::{Interner, Prefix};

    let mut interner = Interner::new();
    let v10 = interner.intern(RawValue::number(10.0));
    let v10_dup = interner.intern(RawValue::number(10.0));
    assert_eq!(v10, v10_dup, "interning the same number twice must dedup to one id");
    let v20 = interner.intern(RawValue::number(20.0));

    let mut sort = Sort::new(vec![], vec![SortKey { register: Register(0), direction: Direction::Down }], Register(1));

    let mut a = Prefix::empty(2);
    a.bind(Register(0), v10);
    sort.insert(a, 0, &interner);

    let mut b = Prefix::empty(2);
    b.bind(Register(0), v10_dup);
    let tie_changes = sort.insert(b, 0, &interner);
    assert_eq!(tie_changes.iter().filter(|(_, _, c)| *c == -1).count(), 0);
    assert_eq!(tie_changes.iter().filter(|(_, _, c)| *c == 1).count(), 1);

    let mut c = Prefix::empty(2);
    c.bind(Register(0), v20);
    let shift_changes = sort.insert(c, 1, &interner);
    assert_eq!(shift_changes.iter().filter(|(_, _, c)| *c == -1).count(), 2);
    assert_eq!(shift_changes.iter().filter(|(_, _, c)| *c == 1).count(), 3);
}

/// A commit-insert followed by its exact commit-remove in the same
/// transaction cancels out — the store never shows the value as present,
/// before or after the transaction settles.
#[test]
fn commit_then_exact_retraction_in_one_transaction_cancels() {
    let mut ctx = context();
    let a = ctx.interner().borrow_mut().intern(RawValue::string("entity"));
    let attr = ctx.interner().borrow_mut().intern(RawValue::string("count"));
    let v = ctx.interner().borrow_mut().intern(RawValue::number(1.0));
    let n = ctx.interner().borrow_mut().intern(RawValue::string("ext"));

    let inputs = vec![
        data_input(RawValue::string("entity"), RawValue::string("count"), RawValue::number(1.0), RawValue::string("ext"), 0, 1),
        data_input(RawValue::string("entity"), RawValue::string("count"), RawValue::number(1.0), RawValue::string("ext"), 0, -1),
    ];
    run_transaction(&mut ctx, 0, inputs).unwrap();
    assert!(!ctx.index().check(a, attr, v, n, 0, 0));
    assert!(!ctx.index().check(a, attr, v, n, 1, 0));
}

/// A rule that keeps matching its own freshly-derived output never lets
/// its round queue empty, so it can never reach a frame boundary at all —
/// it halts with the iteration-limit diagnostic instead, leaving the
/// store exactly as it was before the transaction, including every
/// intermediate value the recursion produced before the limit was hit.
#[test]
fn a_recursive_rule_with_no_fixpoint_aborts_cleanly() {
    let mut config = Config::default();
    config.engine.iteration_limit = 50;
    let mut ctx = EvaluationContext::new(config);

    let counter = ctx.interner().borrow_mut().intern(RawValue::string("counter"));
    let rule = ctx.interner().borrow_mut().intern(RawValue::string("incrementer"));
    let one = ctx.interner().borrow_mut().intern(RawValue::number(1.0));

    let scan = Constraint::Scan(ScanConstraint::new(Field::Register(Register(0)), Field::Static(counter), Field::Register(Register(1)), Field::Ignore));
    let increment = Constraint::Function(FunctionConstraint::new("+", vec![Field::Register(Register(1)), Field::Static(one)], vec![Register(2)]));
    let mut block = Block::new("incrementer", 3, JoinNode::new(vec![scan, increment], 3));
    block.outputs.push((
        StageInput::Join,
        OutputNode::commit_insert(Field::Register(Register(0)), Field::Static(counter), Field::Register(Register(2)), Field::Static(rule)),
    ));
    ctx.add_block(BlockId(0), block);

    let entity = ctx.interner().borrow_mut().intern(RawValue::string("r"));
    let zero = ctx.interner().borrow_mut().intern(RawValue::number(0.0));
    let input = vec![data_input(RawValue::string("r"), RawValue::string("counter"), RawValue::number(0.0), RawValue::string("ext"), 0, 1)];
    let result = run_transaction(&mut ctx, 0, input);
    assert!(matches!(result, Err(EngineError::IterationLimitExceeded { .. })));

    assert!(!ctx.index().check(entity, counter, zero, rule, 0, 0));
    for value in 1..4 {
        let id = ctx.interner().borrow_mut().intern(RawValue::number(value as f64));
        assert!(!ctx.index().check(entity, counter, id, rule, 0, 0));
    }
}

/// A `BLOCK_ADD` fires a static (all-move) join exactly once; a second
/// `BLOCK_ADD` of the same still-dormant block fires nothing further.
#[test]
fn static_join_block_add_fires_once_and_stays_dormant_on_re_add() {
    let mut ctx = context();
    let seeded = ctx.interner().borrow_mut().intern(RawValue::string("bootstrap"));
    let marker = ctx.interner().borrow_mut().intern(RawValue::string("seeded"));
    let rule = ctx.interner().borrow_mut().intern(RawValue::string("bootstrapper"));

    let mv = Constraint::Move(MoveConstraint::new(Field::Static(seeded), Register(0)));
    let mut block = Block::new("bootstrap", 1, JoinNode::new(vec![mv], 1));
    block.outputs.push((
        StageInput::Join,
        OutputNode::commit_insert(Field::Register(Register(0)), Field::Static(marker), Field::Static(marker), Field::Static(rule)),
    ));
    ctx.add_block(BlockId(7), block);

    run_transaction(&mut ctx, 0, vec![TransactionInput::BlockAdd(BlockId(7))]).unwrap();
    assert!(ctx.index().check(seeded, marker, marker, rule, 1, 0));

    run_transaction(&mut ctx, 1, vec![TransactionInput::BlockAdd(BlockId(7))]).unwrap();
    let diffs_after_second_add = ctx.index().get_diffs(seeded, marker, marker, rule, 1);
    assert!(diffs_after_second_add.is_empty());
}
