use std::collections::HashMap;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use blockscript::{
    builtins, EvalContext, FunctionTable, Parser, ScriptError, ScriptResult, Type, Value,
};

struct BenchCtx {
    table: Arc<FunctionTable>,
    locals: HashMap<String, Value>,
}

impl EvalContext for BenchCtx {
    fn functions(&self) -> &FunctionTable {
        &self.table
    }
    fn var_type(&self, name: &str) -> ScriptResult<Type> {
        if name == "spp" {
            Ok(Type::Int)
        } else {
            Err(ScriptError::syntax(format!("unknown variable: {name}")))
        }
    }
    fn var_value(&self, name: &str) -> ScriptResult<Value> {
        if name == "spp" {
            Ok(Value::Int(256))
        } else {
            Err(ScriptError::syntax(format!("unknown variable: {name}")))
        }
    }
    fn get_local(&self, name: &str) -> Option<Value> {
        self.locals.get(name).cloned()
    }
    fn set_local(&mut self, name: &str, value: Value) {
        self.locals.insert(name.into(), value);
    }
}

const GATE: &str = "GE($spp, 16) AND LE($spp, 4096) AND IS_PWR_OF_2($spp)";

fn nested_adds(depth: usize) -> String {
    let mut script = String::from("1");
    for _ in 0..depth {
        script = format!("ADD(1, {script})");
    }
    script
}

fn bench_scripts(c: &mut Criterion) {
    let table = Arc::new(builtins::default_table());
    let parser = Parser::new(table.clone());
    let deep = nested_adds(64);

    let mut g = c.benchmark_group("block_script");

    g.bench_function("parse_gate", |b| {
        b.iter(|| parser.parse(black_box(GATE)).unwrap())
    });

    g.bench_function("parse_nested_64", |b| {
        b.iter(|| parser.parse(black_box(&deep)).unwrap())
    });

    g.bench_function("parse_eval_gate", |b| {
        let mut ctx = BenchCtx {
            table: table.clone(),
            locals: HashMap::new(),
        };
        b.iter(|| {
            let tree = parser.parse(black_box(GATE)).unwrap();
            tree.eval(&mut ctx).unwrap()
        })
    });

    g.finish();
}

criterion_group!(benches, bench_scripts);
criterion_main!(benches);
