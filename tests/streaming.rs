use std::collections::HashMap;

use serve_request::{
    Data, FinishReason, GenerationConfig, Request, RequestStreamOutput, ServeError,
    StreamProgress, StreamTracker, TokenId, output_channel,
};

fn request(id: &str) -> Request {
    Request::new(id, vec![Data::text("prompt")], GenerationConfig::default()).unwrap()
}

#[tokio::test]
async fn concurrent_producers_keep_per_request_order() {
    let (sender, mut receiver) = output_channel(8);
    let mut tracker = StreamTracker::new();
    let mut expected: HashMap<String, Vec<TokenId>> = HashMap::new();

    let mut producers = Vec::new();
    for n in 0..6u32 {
        let id = format!("req-{n}");
        tracker.register(&request(&id)).unwrap();
        expected.insert(id.clone(), (0..20).map(|step| n * 100 + step).collect());

        let mut emitter = sender.emitter(id).unwrap();
        producers.push(tokio::spawn(async move {
            for step in 0..19 {
                emitter.send_delta(vec![n * 100 + step]).await?;
                tokio::task::yield_now().await;
            }
            emitter.finish(vec![n * 100 + 19], FinishReason::Length).await
        }));
    }
    drop(sender);

    let mut completed = HashMap::new();
    while let Some(output) = receiver.recv().await {
        if let StreamProgress::Finished(done) = tracker.observe(&output).unwrap() {
            completed.insert(done.request_id.clone(), done.tokens);
        }
    }
    for producer in producers {
        producer.await.unwrap().unwrap();
    }

    assert_eq!(completed, expected);
    assert_eq!(tracker.in_flight(), 0);
}

#[test]
fn fourth_event_after_stop_is_rejected() {
    let mut tracker = StreamTracker::new();
    tracker.register(&request("r1")).unwrap();

    let events = [
        RequestStreamOutput::new("r1", vec![1, 2], None),
        RequestStreamOutput::new("r1", vec![3], None),
        RequestStreamOutput::new("r1", Vec::new(), Some(FinishReason::Stop)),
    ];
    let mut full = Vec::new();
    for event in &events {
        full.extend_from_slice(event.delta_tokens());
        tracker.observe(event).unwrap();
    }
    assert_eq!(full, vec![1, 2, 3]);
    assert_eq!(
        events.iter().filter(|e| e.finish_reason().is_some()).count(),
        1
    );

    let fourth = RequestStreamOutput::new("r1", vec![4], None);
    assert!(matches!(
        tracker.observe(&fourth),
        Err(ServeError::ProtocolViolation { .. })
    ));
}
