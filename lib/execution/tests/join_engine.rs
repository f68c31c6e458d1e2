//! Engine-level scenarios: strategy selection, the trivial identities, error
//! propagation and the completeness of both hash join algorithms under arbitrary
//! arrival timing.

use futures::{Stream, StreamExt, TryStreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rdf_junction_common::{Cardinality, JoinEvaluationError, JoinResult};
use rdf_junction_execution::coefficients::CoefficientWeights;
use rdf_junction_execution::join::{HashJoin, SymmetricHashJoin};
use rdf_junction_execution::stream::{
    BindingsStream, BindingsStreamAdapter, MemoryBindingsStream, SendableBindingsStream,
};
use rdf_junction_execution::{JoinEngine, JoinEntry, JoinStrategy};
use rdf_junction_model::{Binding, NamedNode, Term, Variable};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

fn var(name: &str) -> Variable {
    Variable::new(name).unwrap()
}

fn iri(value: u64) -> Term {
    NamedNode::new(format!("http://example.com/{value}"))
        .unwrap()
        .into()
}

fn entry(variables: Vec<Variable>, bindings: Vec<Binding>, cardinality: Cardinality) -> JoinEntry {
    JoinEntry {
        stream: Box::pin(MemoryBindingsStream::new(variables.clone(), bindings)),
        variables,
        cardinality,
    }
}

/// The two-entry scenario `A = [{x:1},{x:2}]`, `B = [{x:1,y:9},{x:3,y:7}]` joined on
/// `x`, whose only result is `{x:1,y:9}`.
fn end_to_end_entries() -> Vec<JoinEntry> {
    let x = var("x");
    let y = var("y");
    vec![
        entry(
            vec![x.clone()],
            vec![
                Binding::from_iter([(x.clone(), iri(1))]),
                Binding::from_iter([(x.clone(), iri(2))]),
            ],
            Cardinality::exact(2.0),
        ),
        entry(
            vec![x.clone(), y.clone()],
            vec![
                Binding::from_iter([(x.clone(), iri(1)), (y.clone(), iri(9))]),
                Binding::from_iter([(x.clone(), iri(3)), (y.clone(), iri(7))]),
            ],
            Cardinality::exact(2.0),
        ),
    ]
}

fn single_strategy_engine(strategy: Box<dyn JoinStrategy>) -> JoinEngine {
    let mut engine = JoinEngine::empty(CoefficientWeights::default());
    engine.register_strategy(strategy);
    engine
}

#[tokio::test]
async fn end_to_end_result_is_identical_for_both_hash_algorithms() {
    let x = var("x");
    let y = var("y");
    let expected = vec![Binding::from_iter([(x.clone(), iri(1)), (y.clone(), iri(9))])];

    for strategy in [
        Box::new(HashJoin) as Box<dyn JoinStrategy>,
        Box::new(SymmetricHashJoin) as Box<dyn JoinStrategy>,
    ] {
        let engine = single_strategy_engine(strategy);
        let results = engine.join(end_to_end_entries()).await.unwrap();
        assert_eq!(results.variables, vec![x.clone(), y.clone()]);
        let bindings: Vec<Binding> = results.stream.try_collect().await.unwrap();
        assert_eq!(bindings, expected);
    }
}

#[tokio::test]
async fn joining_zero_entries_yields_the_single_empty_binding() {
    let engine = JoinEngine::new();
    let results = engine.join(Vec::new()).await.unwrap();

    assert!(results.variables.is_empty());
    assert_eq!(results.cardinality, Cardinality::exact(1.0));
    let bindings: Vec<Binding> = results.stream.try_collect().await.unwrap();
    assert_eq!(bindings, vec![Binding::empty()]);
}

#[tokio::test]
async fn joining_a_single_entry_passes_it_through_unchanged() {
    let x = var("x");
    let bindings = vec![
        Binding::from_iter([(x.clone(), iri(1))]),
        Binding::from_iter([(x.clone(), iri(2))]),
    ];

    let engine = JoinEngine::new();
    let results = engine
        .join(vec![entry(
            vec![x.clone()],
            bindings.clone(),
            Cardinality::exact(2.0),
        )])
        .await
        .unwrap();

    assert_eq!(results.variables, vec![x]);
    assert_eq!(results.cardinality, Cardinality::exact(2.0));
    let streamed: Vec<Binding> = results.stream.try_collect().await.unwrap();
    assert_eq!(streamed, bindings);
}

#[tokio::test]
async fn three_entries_fold_into_one_stream() {
    let x = var("x");
    let y = var("y");
    let z = var("z");

    let entries = vec![
        entry(
            vec![x.clone(), y.clone()],
            vec![
                Binding::from_iter([(x.clone(), iri(1)), (y.clone(), iri(10))]),
                Binding::from_iter([(x.clone(), iri(2)), (y.clone(), iri(20))]),
                Binding::from_iter([(x.clone(), iri(3)), (y.clone(), iri(30))]),
            ],
            Cardinality::exact(3.0),
        ),
        entry(
            vec![x.clone()],
            vec![
                Binding::from_iter([(x.clone(), iri(1))]),
                Binding::from_iter([(x.clone(), iri(2))]),
            ],
            Cardinality::exact(2.0),
        ),
        entry(
            vec![y.clone(), z.clone()],
            vec![
                Binding::from_iter([(y.clone(), iri(10)), (z.clone(), iri(100))]),
                Binding::from_iter([(y.clone(), iri(30)), (z.clone(), iri(300))]),
            ],
            Cardinality::exact(2.0),
        ),
    ];

    let engine = JoinEngine::new();
    let results = engine.join(entries).await.unwrap();
    let bindings: Vec<Binding> = results.stream.try_collect().await.unwrap();

    assert_eq!(
        bindings,
        vec![Binding::from_iter([
            (x, iri(1)),
            (y, iri(10)),
            (z, iri(100)),
        ])]
    );
}

#[tokio::test]
async fn upstream_faults_propagate_exactly_once_and_end_the_stream() {
    let x = var("x");
    let failing: SendableBindingsStream = Box::pin(BindingsStreamAdapter::new(
        vec![x.clone()],
        futures::stream::iter(vec![
            Ok(Binding::from_iter([(x.clone(), iri(1))])),
            Err(JoinEvaluationError::source(std::io::Error::other(
                "connection reset",
            ))),
        ]),
    ));

    let entries = vec![
        JoinEntry {
            stream: failing,
            variables: vec![x.clone()],
            cardinality: Cardinality::exact(2.0),
        },
        entry(
            vec![x.clone()],
            vec![Binding::from_iter([(x.clone(), iri(1))])],
            Cardinality::exact(1.0),
        ),
    ];

    let engine = single_strategy_engine(Box::new(SymmetricHashJoin));
    let results = engine.join(entries).await.unwrap();

    let mut stream = results.stream;
    let mut errors = 0;
    while let Some(result) = stream.next().await {
        if result.is_err() {
            errors += 1;
        }
    }
    assert_eq!(errors, 1);
    // The stream stays ended after the terminal error.
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn an_engine_without_strategies_reports_a_configuration_error() {
    let engine = JoinEngine::empty(CoefficientWeights::default());
    let result = engine.join(Vec::new()).await;
    assert!(matches!(
        result,
        Err(JoinEvaluationError::NoApplicableStrategy(0))
    ));
}

#[tokio::test]
async fn inexact_estimates_steer_selection_away_from_the_blocking_hash_join() {
    let engine = JoinEngine::new();

    let exact = [
        entry(vec![var("x")], Vec::new(), Cardinality::exact(100.0)),
        entry(vec![var("x")], Vec::new(), Cardinality::exact(200.0)),
    ];
    assert_eq!(engine.select(&exact).unwrap().name(), "hash");

    let guessed = [
        entry(vec![var("x")], Vec::new(), Cardinality::estimate(100.0)),
        entry(vec![var("x")], Vec::new(), Cardinality::estimate(200.0)),
    ];
    assert_eq!(engine.select(&guessed).unwrap().name(), "symmetric-hash");
}

/// A stream that yields its scripted items with scripted pauses in between, to
/// exercise arbitrary interleavings of item arrival and end signals.
struct ScriptedStream {
    variables: Vec<Variable>,
    script: VecDeque<ScriptStep>,
}

enum ScriptStep {
    Item(Binding),
    Pause,
}

impl Stream for ScriptedStream {
    type Item = JoinResult<Binding>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.get_mut().script.pop_front() {
            Some(ScriptStep::Item(binding)) => Poll::Ready(Some(Ok(binding))),
            Some(ScriptStep::Pause) => {
                // The readability signal may fire spuriously; consumers must retry.
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            None => Poll::Ready(None),
        }
    }
}

impl BindingsStream for ScriptedStream {
    fn variables(&self) -> &[Variable] {
        &self.variables
    }
}

fn scripted_entry(
    variables: Vec<Variable>,
    bindings: Vec<Binding>,
    rng: &mut StdRng,
) -> JoinEntry {
    let mut script = VecDeque::new();
    for binding in bindings {
        for _ in 0..rng.random_range(0..3) {
            script.push_back(ScriptStep::Pause);
        }
        script.push_back(ScriptStep::Item(binding));
    }
    for _ in 0..rng.random_range(0..3) {
        script.push_back(ScriptStep::Pause);
    }
    let cardinality = Cardinality::estimate(script.len() as f64);
    JoinEntry {
        stream: Box::pin(ScriptedStream {
            variables: variables.clone(),
            script,
        }),
        variables,
        cardinality,
    }
}

/// Sorted string forms, so result multisets can be compared independently of
/// production order.
fn canonicalize(bindings: &[Binding]) -> Vec<String> {
    let mut rendered: Vec<String> = bindings.iter().map(ToString::to_string).collect();
    rendered.sort();
    rendered
}

#[tokio::test]
async fn symmetric_join_is_complete_under_randomized_arrival_and_end_timing() {
    let x = var("x");
    let l = var("l");
    let r = var("r");

    // 5 left items and 7 right items over 3 shared keys; every compatible pair must
    // be produced exactly once, no matter how arrivals and end signals interleave.
    let left_bindings: Vec<Binding> = (0..5)
        .map(|i| Binding::from_iter([(x.clone(), iri(i % 3)), (l.clone(), iri(100 + i))]))
        .collect();
    let right_bindings: Vec<Binding> = (0..7)
        .map(|j| Binding::from_iter([(x.clone(), iri(j % 3)), (r.clone(), iri(200 + j))]))
        .collect();

    let mut expected = Vec::new();
    for left in &left_bindings {
        for right in &right_bindings {
            if let Some(merged) = left.merge(right) {
                expected.push(merged);
            }
        }
    }
    let expected = canonicalize(&expected);

    let engine = single_strategy_engine(Box::new(SymmetricHashJoin));
    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let entries = vec![
            scripted_entry(vec![x.clone(), l.clone()], left_bindings.clone(), &mut rng),
            scripted_entry(vec![x.clone(), r.clone()], right_bindings.clone(), &mut rng),
        ];

        let results = engine.join(entries).await.unwrap();
        let bindings: Vec<Binding> = results.stream.try_collect().await.unwrap();
        assert_eq!(canonicalize(&bindings), expected, "seed {seed} diverged");
    }
}
