//! Benchmarks for the ranking engine
//!
//! Run with: cargo bench --package ranking
//!
//! Ranks a synthetic list of a few thousand films under the heaviest
//! selections: all three filters on the active list, rating sort on the archive.

use catalog::{Film, Rating, VoteValue};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ranking::{rank, ArchivedSortMode, HorrorMode, RankingContext, Selections, VoteFilter};

const FILMS: u32 = 5000;
const GENRES: [&str; 5] = ["Horror", "Comedy", "Drama, Horror", "Western", "Sci-Fi"];

fn synthetic_films(archived: bool) -> Vec<Film> {
    (0..FILMS)
        .map(|id| {
            let upvotes = rand::random::<u32>() % 20;
            let downvotes = rand::random::<u32>() % 20;
            Film {
                year: (1950 + id % 70).to_string(),
                genre: (id % 7 != 0).then(|| GENRES[id as usize % GENRES.len()].to_string()),
                director: Some(format!("Director {}", id % 300)),
                plot: Some(format!("Plot of film number {}", id)),
                upvotes,
                neutral_votes: rand::random::<u32>() % 5,
                downvotes,
                total_score: upvotes as i64 - downvotes as i64,
                is_archived: archived,
                ..Film::new(id, format!("Film {}", id))
            }
        })
        .collect()
}

fn synthetic_context() -> RankingContext {
    let mut context = RankingContext::for_profile(1);
    for id in 0..FILMS {
        let vote = match rand::random::<u32>() % 4 {
            0 => VoteValue::Up,
            1 => VoteValue::Neutral,
            2 => VoteValue::Down,
            _ => continue,
        };
        context.votes.insert(id, vote);

        let ratings = (0..rand::random::<u32>() % 6)
            .map(|profile_id| Rating {
                film_id: id,
                profile_id,
                rating: (rand::random::<u8>() % 5) + 1,
            })
            .collect();
        context.ratings.insert(id, ratings);
    }
    context
}

fn bench_rank_active(c: &mut Criterion) {
    let films = synthetic_films(false);
    let context = synthetic_context();
    let selections = Selections::active()
        .with_horror(HorrorMode::Unspooky)
        .with_vote_filter(VoteFilter::Unvoted)
        .with_text_query("director 1");

    c.bench_function("rank_active_filtered", |b| {
        b.iter(|| {
            let ranking = rank(black_box(films.clone()), &context, black_box(&selections));
            black_box(ranking)
        })
    });
}

fn bench_rank_archived_by_rating(c: &mut Criterion) {
    let films = synthetic_films(true);
    let context = synthetic_context();
    let selections = Selections::archived().with_archived_sort(ArchivedSortMode::Rating);

    c.bench_function("rank_archived_by_rating", |b| {
        b.iter(|| {
            let ranking = rank(black_box(films.clone()), &context, black_box(&selections));
            black_box(ranking)
        })
    });
}

criterion_group!(benches, bench_rank_active, bench_rank_archived_by_rating);
criterion_main!(benches);
