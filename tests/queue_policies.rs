use tidywatch::sched::{EnqueuePolicy, ExecutionQueue, ProcessKind, ScheduledUnit};

fn unit(cmd: &str, kind: ProcessKind) -> ScheduledUnit {
    ScheduledUnit::new(cmd, kind)
}

fn drain_commands(queue: &mut ExecutionQueue) -> Vec<String> {
    let mut order = Vec::new();
    while let Some(u) = queue.take_next() {
        order.push(u.command.clone());
        queue.mark_active(u);
        queue.clear_active();
    }
    order
}

#[test]
fn append_preserves_submission_order() {
    let mut queue = ExecutionQueue::new();
    queue.enqueue(unit("a", ProcessKind::Analyze), EnqueuePolicy::Append);
    queue.enqueue(unit("b", ProcessKind::Analyze), EnqueuePolicy::Append);
    queue.enqueue(unit("c", ProcessKind::Analyze), EnqueuePolicy::Append);

    assert_eq!(drain_commands(&mut queue), vec!["a", "b", "c"]);
    assert!(queue.is_idle());
}

#[test]
fn prepend_runs_ahead_of_queued_work() {
    let mut queue = ExecutionQueue::new();
    queue.enqueue(unit("a", ProcessKind::Analyze), EnqueuePolicy::Append);
    queue.enqueue(unit("b", ProcessKind::Analyze), EnqueuePolicy::Append);
    queue.enqueue(unit("c", ProcessKind::Analyze), EnqueuePolicy::Prepend);

    assert_eq!(drain_commands(&mut queue), vec!["c", "a", "b"]);
}

#[test]
fn replace_all_discards_pending_but_not_active() {
    let mut queue = ExecutionQueue::new();

    queue.enqueue(unit("x", ProcessKind::Analyze), EnqueuePolicy::Append);
    let x = queue.take_next().unwrap();
    queue.mark_active(x);

    queue.enqueue(unit("y", ProcessKind::Analyze), EnqueuePolicy::Append);
    queue.enqueue(unit("z", ProcessKind::Analyze), EnqueuePolicy::Append);

    let discarded = queue.enqueue(unit("w", ProcessKind::Analyze), EnqueuePolicy::ReplaceAll);
    assert_eq!(discarded, 2);

    // X keeps running; W is the sole pending entry.
    assert_eq!(queue.active().unwrap().command, "x");
    assert_eq!(queue.pending_len(), 1);

    let x = queue.clear_active().unwrap();
    assert_eq!(x.command, "x");
    assert_eq!(drain_commands(&mut queue), vec!["w"]);
}

#[test]
fn clear_by_kind_leaves_other_kinds_and_active() {
    let mut queue = ExecutionQueue::new();

    queue.enqueue(unit("active", ProcessKind::Analyze), EnqueuePolicy::Append);
    let active = queue.take_next().unwrap();
    queue.mark_active(active);

    queue.enqueue(unit("a1", ProcessKind::Analyze), EnqueuePolicy::Append);
    queue.enqueue(unit("log", ProcessKind::LogGeneration), EnqueuePolicy::Append);
    queue.enqueue(unit("a2", ProcessKind::Analyze), EnqueuePolicy::Append);

    let removed = queue.clear_by_kind(ProcessKind::Analyze);
    assert_eq!(removed, 2);
    assert_eq!(queue.pending_len(), 1);
    assert_eq!(queue.active_kind(), Some(ProcessKind::Analyze));

    // Clearing again matches nothing and silently succeeds.
    assert_eq!(queue.clear_by_kind(ProcessKind::Analyze), 0);

    queue.clear_active();
    assert_eq!(drain_commands(&mut queue), vec!["log"]);
}

#[test]
fn take_next_yields_nothing_while_a_unit_is_active() {
    let mut queue = ExecutionQueue::new();
    queue.enqueue(unit("first", ProcessKind::Analyze), EnqueuePolicy::Append);
    queue.enqueue(unit("second", ProcessKind::Analyze), EnqueuePolicy::Append);

    let first = queue.take_next().unwrap();
    queue.mark_active(first);

    // The head stays put until the active slot is freed.
    assert!(queue.take_next().is_none());
    assert_eq!(queue.pending_len(), 1);

    queue.clear_active();
    assert_eq!(queue.take_next().unwrap().command, "second");
}

#[test]
fn unit_lives_in_exactly_one_place() {
    let mut queue = ExecutionQueue::new();
    queue.enqueue(unit("only", ProcessKind::Analyze), EnqueuePolicy::Append);

    let taken = queue.take_next().unwrap();
    assert_eq!(queue.pending_len(), 0);
    assert!(queue.active().is_none());

    queue.mark_active(taken);
    assert!(queue.active().is_some());
    assert_eq!(queue.pending_len(), 0);

    let back = queue.clear_active().unwrap();
    assert_eq!(back.command, "only");
    assert!(queue.is_idle());
}
