use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stagecraft_core::{PlatformProfile, StageConfig};

fn bench_config_parse(c: &mut Criterion) {
    let toml_text = r#"
[project]
name = "bench-demo"
crate_root = "sourcecode/chunk"

[build]
program = "cargo"
args = ["build", "--color", "always"]

[[deploy]]
artifacts = ["chunkclient"]
destinations = ["sourcecode/VoxelGame/bins"]

[[deploy]]
artifacts = ["chunkserver"]
destinations = ["sourcecode/VoxelGame/server/bins"]

[run.server]
project = "sourcecode/VoxelGame/server"
args = ["--no-window"]

[run.client]
project = "sourcecode/VoxelGame"
"#;

    c.bench_function("parse_config", |b| {
        b.iter(|| {
            let _cfg = StageConfig::from_toml_str(black_box(toml_text), "/work").unwrap();
        })
    });
}

fn bench_deploy_plan(c: &mut Criterion) {
    let profile = PlatformProfile::resolve_for("linux").unwrap();
    let deployer = stagecraft_core::Deployer::new(&profile);
    let artifacts = (0..16)
        .map(|i| stagecraft_core::BuildArtifact::new(format!("crate{i}"), "/work/target/release"))
        .collect::<Vec<_>>();
    let destinations = (0..8)
        .map(|i| std::path::PathBuf::from(format!("/work/consumer{i}/bins")))
        .collect::<Vec<_>>();

    c.bench_function("deploy_plan", |b| {
        b.iter(|| deployer.plan(black_box(&artifacts), black_box(&destinations)))
    });
}

criterion_group!(benches, bench_config_parse, bench_deploy_plan);
criterion_main!(benches);
