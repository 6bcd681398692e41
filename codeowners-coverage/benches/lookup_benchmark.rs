use codeowners_coverage::{compute_coverage, fs::MemFs, OwnershipTable, Walker};
use criterion::{criterion_group, criterion_main, Criterion};

const TEST_PATHS: &[&str] = &[
    "README.md",
    ".github/CODEOWNERS",
    ".github/workflows/ci.yml",
    "docs/guide/getting-started.md",
    "src/app.js",
    "src/components/button/index.tsx",
    "src/components/button/button.test.tsx",
    "services/billing/api/handlers/invoice.go",
    "services/billing/generated/schema.pb.go",
    "vendor/github.com/pkg/errors/errors.go",
    "tools/scripts/release.sh",
    "a/b/c/d/e/f/g/h/deep.txt",
];

const TEST_RULES: &[&str] = &[
    "# Fallback owners",
    "*                               @org/maintainers",
    "*.js                            @org/frontend",
    "*.ts[x]                         @org/frontend",
    "/docs/                          @org/docs @writer",
    "/.github/                       @org/infra",
    "services/**/api/                @org/api",
    "services/billing/               @org/billing",
    "**/generated/",
    "!*.go                           @org/not-go",
    "vendor/",
    "**/*.test.*                     @org/qa",
    "tools/scripts/*.sh              @org/release",
    "a/**/deep.txt                   @org/spelunkers",
];

fn build_table(rules: &[&str]) -> OwnershipTable {
    OwnershipTable::from_lines(rules).unwrap()
}

fn lookup_benchmark(c: &mut Criterion) {
    c.bench_function("building", |b| b.iter(|| build_table(TEST_RULES)));

    let table = build_table(TEST_RULES);
    c.bench_function("matching", |b| {
        b.iter(|| {
            for p in TEST_PATHS {
                table.owners(p);
            }
        })
    });

    let mut fs = MemFs::new();
    for p in TEST_PATHS {
        fs.write_file(p, "").unwrap();
    }
    c.bench_function("coverage", |b| {
        b.iter(|| compute_coverage(&Walker::new(&fs), &table, |_| false).unwrap())
    });
}

criterion_group!(benches, lookup_benchmark);
criterion_main!(benches);
