use criterion::{criterion_group, criterion_main, Criterion};
use pagemark::{find_matches, SearchHints, TextFragment};

const SUBJECTS: &[&str] = &[
    "Matemática", "Lenguaje y Comunicación", "Historia, Geografía y Ciencias Sociales",
    "Ciencias Naturales", "Inglés", "Educación Física", "Artes Visuales", "Música",
];

/// A school supply list page: one line per subject and grade, split the way
/// a PDF text layer breaks lines into spans.
fn synthetic_page() -> Vec<TextFragment> {
    let mut texts = Vec::new();
    for grade in 1..=8 {
        for subject in SUBJECTS {
            texts.push(subject.to_string());
            texts.push(format!("{grade}° Básico - Texto del estudiante"));
            texts.push("Editorial Santillana, edición 2024".to_string());
        }
    }
    TextFragment::from_texts(texts)
}

fn bench_match(c: &mut Criterion) {
    let page = synthetic_page();
    let isbn = SearchHints::with_isbn("978-956-123-456-7");

    let queries = vec![
        ("substring_hit", "Ciencias Naturales", None),
        ("window_hit", "Lenguaje y Comunicación 7° Básico", None),
        ("grade_gate_miss", "Lenguaje y Comunicación 9° Básico", None),
        ("isbn_miss_fallthrough", "Música 3° Básico", Some(&isbn)),
    ];

    let mut group = c.benchmark_group("find_matches");
    group.sample_size(20);

    for (name, query, hints) in queries {
        group.bench_function(name, |b| {
            b.iter(|| find_matches(query, &page, hints));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_match);
criterion_main!(benches);
