use codeact::callgraph::{CallGraphOptions, CallGraphRequest, call_graph};
use codeact::cancel::CancellationToken;
use codeact::codemodel::CodeModel;
use codeact::csharp::CSharpCodeModel;
use codeact::workspace::{SessionHost, Snapshot, Workspace};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

const CLASSES: usize = 20;
const METHODS: usize = 10;

/// `CLASSES` files, each method calling the next one and a method in the
/// following class, so every walk fans out.
fn generated_workspace() -> Workspace {
    let mut builder = Snapshot::builder();
    for class in 0..CLASSES {
        let next = (class + 1) % CLASSES;
        let mut source = format!("namespace Bench\n{{\n    class C{class}\n    {{\n");
        for method in 0..METHODS {
            let callee = (method + 1) % METHODS;
            source.push_str(&format!(
                "        public static void M{method}() {{ M{callee}(); C{next}.M{method}(); }}\n"
            ));
        }
        source.push_str("    }\n}\n");
        builder = builder.document("Bench", &format!("C{class}.cs"), source.as_str(), None);
    }
    Workspace::in_memory(builder.build())
}

fn root_id(host: &Workspace, model: &CSharpCodeModel) -> String {
    let (snapshot, _) = host.current();
    let index = model.symbols(&snapshot).expect("index");
    index.by_qualname("Bench.C0.M0")[0].id.clone()
}

fn bench_directions(c: &mut Criterion) {
    let host = generated_workspace();
    let model = CSharpCodeModel::new();
    let symbol_id = root_id(&host, &model);
    let options = CallGraphOptions { depth_limit: 4 };
    let cancel = CancellationToken::new();

    let mut group = c.benchmark_group("call_graph_directions");
    for direction in ["incoming", "outgoing", "both"] {
        let request = CallGraphRequest {
            symbol_id: symbol_id.clone(),
            direction: direction.to_string(),
            max_depth: Some(3),
        };
        group.bench_function(direction, |b| {
            b.iter(|| {
                let graph = call_graph(
                    black_box(&host),
                    black_box(&model),
                    black_box(&request),
                    &options,
                    &cancel,
                );
                black_box(graph)
            })
        });
    }
    group.finish();
}

fn bench_varying_depth(c: &mut Criterion) {
    let host = generated_workspace();
    let model = CSharpCodeModel::new();
    let symbol_id = root_id(&host, &model);
    let options = CallGraphOptions { depth_limit: 4 };
    let cancel = CancellationToken::new();

    let mut group = c.benchmark_group("call_graph_varying_depth");
    for depth in [1, 2, 3, 4] {
        let request = CallGraphRequest {
            symbol_id: symbol_id.clone(),
            direction: "both".to_string(),
            max_depth: Some(depth),
        };
        group.bench_with_input(format!("depth_{depth}"), &request, |b, request| {
            b.iter(|| black_box(call_graph(&host, &model, request, &options, &cancel)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_directions, bench_varying_depth);
criterion_main!(benches);
