use anyhow::{Context, Result, anyhow, bail};
use catalog::{Catalog, Film, FilmId, Mode, ProfileId, VoteOutcome, VoteValue};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use ranking::{
    ArchivedSortMode, EmptyReason, HorrorMode, Narrowing, RankedFilm, Ranking, Selection,
    Selections, SortMode, Synopsis, VoteFilter, build_ranking_context, rank,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

/// Paradiso - group film voting
#[derive(Parser)]
#[command(name = "paradiso")]
#[command(about = "Rank, vote on and archive the films your group wants to watch", long_about = None)]
struct Cli {
    /// Path to the catalog snapshot (JSON)
    #[arg(short, long, env = "PARADISO_SNAPSHOT", default_value = "data/snapshot.json")]
    snapshot: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the ranked film list
    Rank {
        /// Profile (name or id) whose votes and viewed marks to show
        #[arg(long)]
        profile: Option<String>,

        /// Show the archive instead of the active list
        #[arg(long)]
        archived: bool,

        /// all, spooky or unspooky
        #[arg(long, default_value = "all")]
        horror: String,

        /// none, unvoted, upvoted, neutral or downvoted
        #[arg(long, default_value = "none")]
        vote_filter: String,

        /// Free text matched against title, people, genre, year and plot
        #[arg(long, default_value = "")]
        query: String,

        /// score or ratio (active list)
        #[arg(long, default_value = "score")]
        sort: String,

        /// date or rating (archive)
        #[arg(long, default_value = "date")]
        archived_sort: String,

        /// Only count votes from these profiles (comma separated names or ids)
        #[arg(long, value_delimiter = ',')]
        identities: Vec<String>,

        /// Maximum number of films to print
        #[arg(long)]
        limit: Option<usize>,

        /// Reject unknown filter or sort names instead of falling back to defaults
        #[arg(long)]
        strict: bool,
    },

    /// Show a profile's votes, viewed marks and ratings
    Profile {
        /// Profile name or id
        #[arg(long)]
        name: String,
    },

    /// Create a new profile
    AddProfile {
        #[arg(long)]
        name: String,
    },

    /// Delete a profile and everything it recorded
    DeleteProfile {
        /// Profile name or id
        #[arg(long)]
        name: String,
    },

    /// Show who voted on and viewed a film
    Voters {
        #[arg(long)]
        film: FilmId,
    },

    /// Vote on a film; casting the same vote again retracts it
    Vote {
        #[arg(long)]
        film: FilmId,

        #[arg(long)]
        profile: String,

        /// up, neutral, down or none
        #[arg(long)]
        value: String,
    },

    /// Toggle a film's viewed mark for a profile
    Viewed {
        #[arg(long)]
        film: FilmId,

        #[arg(long)]
        profile: String,
    },

    /// Rate an archived film from 1 to 5 stars
    Rate {
        #[arg(long)]
        film: FilmId,

        #[arg(long)]
        profile: String,

        #[arg(long, required_unless_present = "delete")]
        stars: Option<u8>,

        /// Remove the profile's rating instead
        #[arg(long)]
        delete: bool,
    },

    /// Comment on an archived film
    Comment {
        #[arg(long)]
        film: FilmId,

        #[arg(long)]
        profile: String,

        #[arg(long, required_unless_present = "delete")]
        text: Option<String>,

        /// Remove the profile's comment instead
        #[arg(long)]
        delete: bool,
    },

    /// Move a film to the archive, or back with --undo
    Archive {
        #[arg(long)]
        film: FilmId,

        /// Date the group watched it (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        commentary: Option<String>,

        /// Put the film back on the active list
        #[arg(long)]
        undo: bool,
    },

    /// Set or clear a film's spoiler-free teaser
    Teaser {
        #[arg(long)]
        film: FilmId,

        #[arg(long, required_unless_present = "clear")]
        text: Option<String>,

        /// Profile submitting the teaser
        #[arg(long)]
        profile: Option<String>,

        #[arg(long)]
        clear: bool,
    },

    /// Add a film to the active list
    AddFilm(NewFilm),

    /// Set or clear the title a film was released under
    OriginalTitle {
        #[arg(long)]
        film: FilmId,

        #[arg(long, required_unless_present = "clear")]
        text: Option<String>,

        #[arg(long)]
        clear: bool,
    },

    /// Delete a film and everything recorded about it
    DeleteFilm {
        #[arg(long)]
        film: FilmId,
    },

    /// Time the ranking engine over random selections
    Benchmark {
        /// Number of rankings to run
        #[arg(long, default_value = "1000")]
        iterations: usize,
    },
}

/// Film details for `add-film`, as found on the film's IMDb page
#[derive(Args)]
struct NewFilm {
    #[arg(long)]
    title: String,

    /// IMDb id (tt...); a film can only be added once
    #[arg(long)]
    imdb_id: Option<String>,

    #[arg(long, default_value = "")]
    year: String,

    #[arg(long)]
    original_title: Option<String>,

    /// Comma separated, as IMDb lists them
    #[arg(long)]
    genre: Option<String>,

    #[arg(long)]
    director: Option<String>,

    #[arg(long)]
    actors: Option<String>,

    #[arg(long)]
    plot: Option<String>,

    #[arg(long)]
    poster_url: Option<String>,

    #[arg(long)]
    trailer_url: Option<String>,

    /// Spoiler-free teaser shown instead of the plot
    #[arg(long)]
    teaser: Option<String>,

    /// Profile submitting the teaser
    #[arg(long, requires = "teaser")]
    profile: Option<String>,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let start = Instant::now();
    let mut catalog = Catalog::load_from_file(&cli.snapshot)
        .with_context(|| format!("Failed to load snapshot {}", cli.snapshot.display()))?;
    info!("Catalog ready in {:?}", start.elapsed());

    // Read-only commands return early; the rest fall through to the save
    match cli.command {
        Commands::Rank {
            profile,
            archived,
            horror,
            vote_filter,
            query,
            sort,
            archived_sort,
            identities,
            limit,
            strict,
        } => {
            let profile = profile
                .map(|key| resolve_profile(&catalog, &key))
                .transpose()?;
            let selections = Selections {
                mode: if archived { Mode::Archived } else { Mode::Active },
                horror: parse_selection(&horror, strict)?,
                vote_filter: parse_selection(&vote_filter, strict)?,
                text_query: query,
                sort: parse_selection(&sort, strict)?,
                archived_sort: parse_selection(&archived_sort, strict)?,
                identities: identities
                    .iter()
                    .map(|key| resolve_profile(&catalog, key))
                    .collect::<Result<_>>()?,
            };
            return handle_rank(&catalog, profile, &selections, limit);
        }
        Commands::Profile { name } => return handle_profile(&catalog, &name),
        Commands::Voters { film } => return handle_voters(&catalog, film),
        Commands::Benchmark { iterations } => return handle_benchmark(&catalog, iterations),

        Commands::AddProfile { name } => {
            let profile = catalog.create_profile(&name)?;
            println!("{} Created profile {} (id {})", "✓".green(), profile.name.bold(), profile.id);
        }
        Commands::DeleteProfile { name } => {
            let id = resolve_profile(&catalog, &name)?;
            let profile = catalog.delete_profile(id)?;
            println!("{} Deleted profile {}", "✓".green(), profile.name.bold());
        }
        Commands::Vote {
            film,
            profile,
            value,
        } => handle_vote(&mut catalog, film, &profile, &value)?,
        Commands::Viewed { film, profile } => {
            let profile = resolve_profile(&catalog, &profile)?;
            let viewed = catalog.toggle_viewed(film, profile)?;
            let state = if viewed { "viewed" } else { "not viewed" };
            println!("{} {} is now {}", "✓".green(), film_title(&catalog, film)?, state);
        }
        Commands::Rate {
            film,
            profile,
            stars,
            delete,
        } => handle_rate(&mut catalog, film, &profile, stars, delete)?,
        Commands::Comment {
            film,
            profile,
            text,
            delete,
        } => handle_comment(&mut catalog, film, &profile, text, delete)?,
        Commands::Archive {
            film,
            date,
            commentary,
            undo,
        } => handle_archive(&mut catalog, film, date, commentary, undo)?,
        Commands::Teaser {
            film,
            text,
            profile,
            clear,
        } => {
            if clear {
                catalog.clear_teaser(film)?;
                println!("{} Teaser cleared", "✓".green());
            } else {
                let submitted_by = profile
                    .map(|key| resolve_profile(&catalog, &key))
                    .transpose()?;
                catalog.set_teaser(film, text.as_deref().unwrap_or_default(), submitted_by)?;
                println!("{} Teaser saved for {}", "✓".green(), film_title(&catalog, film)?);
            }
        }
        Commands::AddFilm(new_film) => handle_add_film(&mut catalog, new_film)?,
        Commands::OriginalTitle { film, text, clear } => {
            let text = if clear { "" } else { text.as_deref().unwrap_or_default() };
            catalog.set_original_title(film, text)?;
            println!("{} Original title updated for {}", "✓".green(), film_title(&catalog, film)?);
        }
        Commands::DeleteFilm { film } => {
            let removed = catalog.delete_film(film)?;
            println!("{} Deleted {}", "✓".green(), removed.title.bold());
        }
    }

    catalog
        .save_to_file(&cli.snapshot)
        .with_context(|| format!("Failed to write snapshot {}", cli.snapshot.display()))?;
    Ok(())
}

/// Look a profile up by name or id
fn resolve_profile(catalog: &Catalog, key: &str) -> Result<ProfileId> {
    catalog
        .find_profile(key)
        .map(|profile| profile.id)
        .ok_or_else(|| anyhow!("Profile {} not found", key))
}

fn film_title(catalog: &Catalog, film_id: FilmId) -> Result<String> {
    catalog
        .get_film(film_id)
        .map(|film| film.title.clone())
        .ok_or_else(|| anyhow!("Film {} not found", film_id))
}

fn parse_selection<S: Selection>(value: &str, strict: bool) -> Result<S> {
    if strict {
        Ok(S::parse(value)?)
    } else {
        Ok(S::parse_lenient(value))
    }
}

fn parse_vote(value: &str) -> Result<VoteValue> {
    match value.trim().to_lowercase().as_str() {
        "up" | "upvote" => Ok(VoteValue::Up),
        "neutral" => Ok(VoteValue::Neutral),
        "down" | "downvote" => Ok(VoteValue::Down),
        "none" | "retract" => Ok(VoteValue::None),
        other => bail!("Unknown vote {:?} (expected up, neutral, down or none)", other),
    }
}

/// Handle the 'rank' command
fn handle_rank(
    catalog: &Catalog,
    profile: Option<ProfileId>,
    selections: &Selections,
    limit: Option<usize>,
) -> Result<()> {
    let context = build_ranking_context(catalog, profile)?;
    let films = catalog.films_with_tallies(selections.mode, selections.identity_scope());
    let ranking = rank(films, &context, selections);

    let title = match selections.mode {
        Mode::Active => "Films to watch",
        Mode::Archived => "Watched films",
    };
    println!("{}", title.bold().blue());

    if let Some(reason) = &ranking.empty_reason {
        println!("{}", empty_message(reason, selections).yellow());
        return Ok(());
    }

    print_ranking(catalog, &ranking, limit.unwrap_or(ranking.len()));
    Ok(())
}

/// The line shown instead of an empty list
fn empty_message(reason: &EmptyReason, selections: &Selections) -> String {
    let EmptyReason::Filtered(active) = reason else {
        return match selections.mode {
            Mode::Active => "No films yet. Add one with add-film!".to_string(),
            Mode::Archived => "No watched films yet.".to_string(),
        };
    };
    match active.primary() {
        Some(Narrowing::VoteState(filter)) => format!("No {} films found!", filter.as_str()),
        Some(Narrowing::Horror(HorrorMode::Spooky)) => "No spooky films found!".to_string(),
        Some(Narrowing::Horror(_)) => "No unspooky films found!".to_string(),
        Some(Narrowing::Text(_)) => {
            format!("No films found matching \"{}\"", selections.text_query.trim())
        }
        None => "No films found!".to_string(),
    }
}

/// Helper function to format and print a ranking
fn print_ranking(catalog: &Catalog, ranking: &Ranking, limit: usize) {
    for entry in ranking.entries.iter().take(limit) {
        let film = &entry.film;
        let genre = film.genre.as_deref().unwrap_or("?");
        println!(
            "{}. {} ({}) [{}]",
            entry.position.to_string().green(),
            film.title.bold(),
            film.year,
            genre
        );
        if let Some(original) = &film.original_title {
            println!("   {}", original.italic());
        }

        match film.mode() {
            Mode::Active => print_vote_line(entry),
            Mode::Archived => print_archive_line(entry),
        }
        print_synopsis(catalog, &entry.synopsis);
    }

    if limit < ranking.len() {
        println!("   ... and {} more", ranking.len() - limit);
    }
}

fn print_vote_line(entry: &RankedFilm) {
    let film = &entry.film;
    let mut line = format!(
        "   Score: {:+}  Ratio: {}%  ({} up / {} neutral / {} down)",
        film.total_score,
        entry.ratio_percent(),
        film.upvotes,
        film.neutral_votes,
        film.downvotes
    );
    match entry.viewer_vote {
        VoteValue::Up => line.push_str(&format!("  {}", "you: up".green())),
        VoteValue::Neutral => line.push_str(&format!("  {}", "you: neutral".cyan())),
        VoteValue::Down => line.push_str(&format!("  {}", "you: down".red())),
        VoteValue::None => {}
    }
    if entry.viewed {
        line.push_str(&format!("  {}", "viewed".dimmed()));
    }
    println!("{}", line);
}

fn print_archive_line(entry: &RankedFilm) {
    let film = &entry.film;
    let date = film
        .archive_date
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "undated".to_string());
    let rating = match (entry.display_rating(), entry.rating) {
        (Some(mean), Some(stats)) => format!("{} {} ({} ratings)", "★".yellow(), mean, stats.count),
        _ => "no ratings yet".dimmed().to_string(),
    };
    println!("   Watched: {}  {}", date, rating);
    if let Some(commentary) = &film.archive_commentary {
        println!("   {}", commentary.italic());
    }
}

fn print_synopsis(catalog: &Catalog, synopsis: &Synopsis) {
    match synopsis {
        Synopsis::Teaser { text, submitted_by } => {
            let by = submitted_by
                .and_then(|id| catalog.get_profile(id))
                .map(|p| format!(" (by {})", p.name))
                .unwrap_or_default();
            println!("   {} {}{}", "Teaser:".magenta(), text, by);
        }
        Synopsis::Plot { plot, trailer_url } => {
            if let Some(plot) = plot {
                println!("   {}", plot);
            }
            if let Some(url) = trailer_url {
                println!("   Trailer: {}", url.underline());
            }
        }
    }
}

/// Handle the 'profile' command
fn handle_profile(catalog: &Catalog, key: &str) -> Result<()> {
    let id = resolve_profile(catalog, key)?;
    let profile = catalog
        .get_profile(id)
        .ok_or_else(|| anyhow!("Profile {} not found", id))?;

    let votes = catalog.profile_votes(id);
    let count = |value: VoteValue| votes.values().filter(|&&v| v == value).count();
    let ratings: Vec<_> = catalog
        .all_ratings()
        .values()
        .flatten()
        .filter(|r| r.profile_id == id)
        .collect();

    println!("{}", format!("Profile: {} (id {})", profile.name, id).bold().blue());
    println!("{}Upvotes: {}", "• ".green(), count(VoteValue::Up));
    println!("{}Neutral votes: {}", "• ".green(), count(VoteValue::Neutral));
    println!("{}Downvotes: {}", "• ".green(), count(VoteValue::Down));
    println!("{}Films viewed: {}", "• ".cyan(), catalog.profile_viewed(id).len());
    println!("{}Films rated: {}", "• ".cyan(), ratings.len());

    if !ratings.is_empty() {
        let mean = ratings.iter().map(|r| r.rating as f64).sum::<f64>() / ratings.len() as f64;
        println!("{}Average stars given: {:.1}", "• ".cyan(), mean);
    }
    Ok(())
}

/// Handle the 'voters' command
fn handle_voters(catalog: &Catalog, film_id: FilmId) -> Result<()> {
    let title = film_title(catalog, film_id)?;
    let voters = catalog.film_voters(film_id);
    let viewers = catalog.film_viewers(film_id, None);

    let names = |names: &[String]| {
        if names.is_empty() {
            "-".to_string()
        } else {
            names.join(", ")
        }
    };

    println!("{}", format!("Votes on {}", title).bold().blue());
    println!("{} {}", "Up:".green(), names(&voters.upvoters));
    println!("{} {}", "Neutral:".cyan(), names(&voters.neutral_voters));
    println!("{} {}", "Down:".red(), names(&voters.downvoters));
    println!("{} {}", "Viewed by:".dimmed(), names(&viewers));

    let comments = catalog.film_comments(film_id);
    if !comments.is_empty() {
        println!("{}", "Comments:".bold());
        for comment in comments {
            let author = catalog
                .get_profile(comment.profile_id)
                .map(|p| p.name.as_str())
                .unwrap_or("?");
            println!(
                "  {} ({}): {}",
                author.bold(),
                comment.created_at.format("%d/%m/%Y"),
                comment.text
            );
        }
    }
    Ok(())
}

/// Handle the 'vote' command
fn handle_vote(catalog: &mut Catalog, film_id: FilmId, profile: &str, value: &str) -> Result<()> {
    let profile_id = resolve_profile(catalog, profile)?;
    let value = parse_vote(value)?;
    let outcome = catalog.cast_vote(film_id, profile_id, value)?;

    let title = film_title(catalog, film_id)?;
    let message = match outcome {
        VoteOutcome::Created | VoteOutcome::Updated => format!("Vote recorded on {}", title),
        VoteOutcome::Removed => format!("Vote on {} retracted", title),
        VoteOutcome::NoVote => format!("No vote on {} to retract", title),
    };
    println!("{} {}", "✓".green(), message);

    if let Some(film) = catalog.get_film(film_id) {
        println!(
            "   Score: {:+} ({} up / {} neutral / {} down)",
            film.total_score, film.upvotes, film.neutral_votes, film.downvotes
        );
    }
    Ok(())
}

/// Handle the 'rate' command
fn handle_rate(
    catalog: &mut Catalog,
    film_id: FilmId,
    profile: &str,
    stars: Option<u8>,
    delete: bool,
) -> Result<()> {
    let profile_id = resolve_profile(catalog, profile)?;
    if delete {
        if catalog.delete_rating(film_id, profile_id)? {
            println!("{} Rating removed", "✓".green());
        } else {
            println!("No rating to remove");
        }
        return Ok(());
    }

    let stars = stars.ok_or_else(|| anyhow!("--stars is required"))?;
    catalog.set_rating(film_id, profile_id, stars)?;
    if let Some(stats) = catalog.rating_stats(film_id) {
        println!(
            "{} Rated {} stars; average now {:.1} over {} ratings",
            "✓".green(),
            stars,
            stats.mean,
            stats.count
        );
    }
    Ok(())
}

/// Handle the 'comment' command
fn handle_comment(
    catalog: &mut Catalog,
    film_id: FilmId,
    profile: &str,
    text: Option<String>,
    delete: bool,
) -> Result<()> {
    let profile_id = resolve_profile(catalog, profile)?;
    if delete {
        if catalog.delete_comment(film_id, profile_id)? {
            println!("{} Comment removed", "✓".green());
        } else {
            println!("No comment to remove");
        }
        return Ok(());
    }

    let text = text.ok_or_else(|| anyhow!("--text is required"))?;
    catalog.set_comment(film_id, profile_id, &text, Utc::now())?;
    println!("{} Comment saved", "✓".green());
    Ok(())
}

/// Handle the 'archive' command
/// Handle the 'add-film' command
fn handle_add_film(catalog: &mut Catalog, new_film: NewFilm) -> Result<()> {
    let submitted_by = new_film
        .profile
        .map(|key| resolve_profile(catalog, &key))
        .transpose()?;

    let film = catalog.add_film(Film {
        imdb_id: new_film.imdb_id,
        year: new_film.year,
        original_title: new_film.original_title,
        genre: new_film.genre,
        director: new_film.director,
        actors: new_film.actors,
        plot: new_film.plot,
        poster_url: new_film.poster_url,
        trailer_url: new_film.trailer_url,
        teaser_text: new_film.teaser,
        submitted_by_profile_id: submitted_by,
        ..Film::new(0, new_film.title)
    })?;

    let year = if film.year.is_empty() {
        String::new()
    } else {
        format!(" ({})", film.year)
    };
    println!("{} Added {}{} (id {})", "✓".green(), film.title.bold(), year, film.id);
    Ok(())
}

fn handle_archive(
    catalog: &mut Catalog,
    film_id: FilmId,
    date: Option<String>,
    commentary: Option<String>,
    undo: bool,
) -> Result<()> {
    let title = film_title(catalog, film_id)?;
    if undo {
        let dropped = catalog.unarchive_film(film_id)?;
        println!("{} {} is back on the list", "✓".green(), title.bold());
        if dropped > 0 {
            println!("  {} {} ratings and comments removed", "!".yellow(), dropped);
        }
        return Ok(());
    }

    let date = match date {
        Some(text) => catalog::parser::parse_archive_date(&text)?,
        None => Some(Utc::now().date_naive()),
    };

    let already_archived = catalog
        .get_film(film_id)
        .is_some_and(|film| film.is_archived);
    if already_archived {
        catalog.set_archive_metadata(film_id, date, commentary)?;
        println!("{} Updated archive details for {}", "✓".green(), title.bold());
    } else {
        catalog.archive_film(film_id, date, commentary)?;
        println!("{} Archived {}", "✓".green(), title.bold());
    }
    Ok(())
}

/// Handle the 'benchmark' command
fn handle_benchmark(catalog: &Catalog, iterations: usize) -> Result<()> {
    if iterations == 0 {
        bail!("Need at least one iteration");
    }

    let profiles: Vec<ProfileId> = catalog.profiles().map(|p| p.id).collect();
    let mut timings: Vec<Duration> = Vec::with_capacity(iterations);

    for _ in 0..iterations {
        let profile = match profiles.len() {
            0 => None,
            n => Some(profiles[rand::random::<u32>() as usize % n]),
        };
        let selections = random_selections();

        let start = Instant::now();
        let context = build_ranking_context(catalog, profile)?;
        let films = catalog.films_with_tallies(selections.mode, selections.identity_scope());
        let ranking = rank(films, &context, &selections);
        timings.push(start.elapsed());

        std::hint::black_box(ranking);
    }

    let total_time: Duration = timings.iter().sum();
    let avg_latency = total_time / timings.len() as u32;
    timings.sort();
    let percentile = |p: f64| timings[((timings.len() as f64 * p) as usize).min(timings.len() - 1)];

    println!("{}", "Benchmark results:".bold().blue());
    println!("Iterations: {}", iterations);
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!(
        "Throughput: {:.2} rankings/second",
        iterations as f64 / total_time.as_secs_f64()
    );
    Ok(())
}

fn pick<S: Selection>() -> S {
    S::OPTIONS[rand::random::<u32>() as usize % S::OPTIONS.len()].1
}

fn random_selections() -> Selections {
    Selections {
        mode: pick(),
        horror: pick::<HorrorMode>(),
        vote_filter: pick::<VoteFilter>(),
        text_query: String::new(),
        sort: pick::<SortMode>(),
        archived_sort: pick::<ArchivedSortMode>(),
        identities: Vec::new(),
    }
}
