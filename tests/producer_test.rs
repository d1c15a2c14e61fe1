//! Integration tests for the producer submit-or-abandon protocol.

use dispatchq::event::{EventKind, Journal, MemoryReporter};
use dispatchq::producer::{CycleOutcome, Producer};
use dispatchq::queue::DispatchQueue;
use dispatchq::simulator::{FixedSimulator, NoopSimulator};
use dispatchq::worker::Worker;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn producer_completes_its_target() {
    let queue = Arc::new(DispatchQueue::new(2).unwrap());
    let memory = Arc::new(MemoryReporter::new());
    let journal = Journal::new(memory.clone());
    let simulator = Arc::new(NoopSimulator);

    let token = CancellationToken::new();
    let worker = Worker::new("Remy", queue.clone(), simulator.clone(), journal.clone());
    let worker = tokio::spawn(worker.run(token.clone()));

    let report = Producer::new("Ani", queue.clone(), simulator, journal)
        .target(3)
        .deadline(None)
        .run()
        .await
        .unwrap();

    assert_eq!(report.producer, "Ani");
    assert_eq!(report.completed, 3);
    assert_eq!(report.abandoned, 0);
    let ids: HashSet<_> = report.completions.iter().map(|c| c.id).collect();
    assert_eq!(ids.len(), 3);
    assert!(
        report
            .completions
            .iter()
            .all(|c| c.serviced_by.as_deref() == Some("Remy"))
    );

    token.cancel();
    assert_eq!(worker.await.unwrap().unwrap(), 3);
    assert_eq!(
        memory.count(|k| matches!(
            k,
            EventKind::ProducerFinished { completed: 3, abandoned: 0, .. }
        )),
        1
    );
}

#[tokio::test]
async fn zero_target_finishes_without_submitting() {
    let queue = Arc::new(DispatchQueue::new(1).unwrap());
    let memory = Arc::new(MemoryReporter::new());
    let report = Producer::new("Bai", queue.clone(), Arc::new(NoopSimulator), Journal::new(memory.clone()))
        .target(0)
        .run()
        .await
        .unwrap();

    assert_eq!(report.completed, 0);
    assert!(queue.is_empty());
    assert_eq!(
        memory.count(|k| matches!(k, EventKind::RequestPlaced { .. })),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn cycle_abandons_when_queue_stays_full() {
    let queue = Arc::new(DispatchQueue::new(1).unwrap());
    let (blocker, _reply) = queue.new_request("blocker");
    queue.submit(blocker).await.unwrap();

    let memory = Arc::new(MemoryReporter::new());
    let producer = Producer::new("Cat", queue.clone(), Arc::new(NoopSimulator), Journal::new(memory.clone()))
        .deadline(Some(Duration::from_millis(100)));

    let outcome = producer.cycle().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Abandoned(_)));
    assert_eq!(queue.len(), 1);
    assert_eq!(
        memory.count(|k| matches!(k, EventKind::RequestAbandoned { origin, .. } if origin == "Cat")),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn abandoned_cycles_are_retried_until_target_met() {
    let queue = Arc::new(DispatchQueue::new(1).unwrap());
    let (blocker, _blocker_reply) = queue.new_request("blocker");
    queue.submit(blocker).await.unwrap();

    let memory = Arc::new(MemoryReporter::new());
    let journal = Journal::new(memory.clone());
    let simulator = Arc::new(FixedSimulator::new(Duration::from_millis(10)));

    let producer = Producer::new("Dao", queue.clone(), simulator.clone(), journal.clone())
        .target(1)
        .deadline(Some(Duration::from_millis(100)))
        .hints(2, 5);
    let producer = tokio::spawn(producer.run());

    // Nothing drains the queue for a while, so early cycles time out.
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(queue.take().await.unwrap().origin(), "blocker");

    let token = CancellationToken::new();
    let worker = Worker::new("Linguini", queue.clone(), simulator, journal);
    let worker = tokio::spawn(worker.run(token.clone()));

    let report = producer.await.unwrap().unwrap();
    assert_eq!(report.completed, 1);
    assert!(report.abandoned >= 2, "abandoned {}", report.abandoned);
    assert_eq!(
        memory.count(|k| matches!(k, EventKind::RequestAbandoned { .. })),
        report.abandoned as usize
    );

    // Abandoned requests never reached the worker.
    token.cancel();
    assert_eq!(worker.await.unwrap().unwrap(), 1);
    assert!(queue.is_empty());
    let serviced: Vec<_> = memory
        .events()
        .into_iter()
        .filter_map(|e| match e.kind {
            EventKind::RequestServicing { id, .. } => Some(id),
            _ => None,
        })
        .collect();
    assert_eq!(serviced, vec![report.completions[0].id]);
}
