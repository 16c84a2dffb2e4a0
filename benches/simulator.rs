use criterion::{criterion_group, criterion_main, Criterion};
use tinyrv::debugger::Debugger;
use tinyrv::loader;
use tinyrv::simulator::Machine;

/// (name, program text, instructions to run)
const TESTCASES: &[(&str, &str, u64)] = &[
    // addi x1,x1,1 / jal x0,-4
    ("increment loop", "13 1 1 1\n31 0 -4 0\n", 1_000_000),
    // li x2,0x40 / sw x1,0(x2) / lw x3,0(x2) / addi x1,x1,1 / j -16
    (
        "memory loop",
        "35 2 64 0\n24 1 2 0\n23 3 2 0\n13 1 1 1\n54 -16 0 0\n",
        1_000_000,
    ),
    // lui x2,0x100 / addi x2,x2,0x40 / li x3,0x0300AF00 / sw x3,0(x2) / j -4
    (
        "display commands",
        "21 2 256 0\n13 2 2 64\n35 3 50376448 0\n24 3 2 0\n54 -4 0 0\n",
        1_000_000,
    ),
];

fn criterion_benchmark(c: &mut Criterion) {
    for &(name, text, lifetime) in TESTCASES {
        c.bench_function(name, |b| {
            b.iter(|| {
                let program = loader::load_str(text, name, 16)
                    .unwrap_or_else(|e| panic!("Couldn't load {name}: {e}"));
                let mut machine = Machine::with_memory_size(program, 0x0010_1000).unwrap();
                machine.run(&Debugger::headless(), Some(lifetime))
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
