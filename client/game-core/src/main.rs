use anyhow::{anyhow, Context, Result};
use finanzas_game_core::games::coins::CoinRound;
use finanzas_game_core::games::counting::CountingRound;
use finanzas_game_core::games::debt::{DebtAnswer, Scenario};
use finanzas_game_core::games::needs_wants::{Category, Item};
use finanzas_game_core::games::piggy_bank::Question;
use finanzas_game_core::games::{
    CoinRecognition, CountingMoney, DebtScenarios, GameDefinition, InterestCalculator,
    LemonadeStand, MiniGame, NeedsWants, PiggyBankStory, SavingsChallenge, Simulation,
};
use finanzas_game_core::models::commit::{CommitOutcome, CommitRequest};
use finanzas_game_core::models::game::GamePhase;
use finanzas_game_core::models::{EducationLevel, RewardGrant, ScoreResult, SummaryTier};
use finanzas_game_core::services::round_engine::EngineOptions;
use finanzas_game_core::{AppState, Config, RoundEngine};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "finanzas_game_core=info,finanzas_play=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load().context("Failed to load configuration")?;
    tracing::info!(
        "Configuration loaded for environment: {:?}",
        std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string())
    );

    let app = AppState::new(config);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let profile = match app.auth.restore_session().await? {
        Some(profile) => profile,
        None => sign_in(&app, &mut input).await?,
    };
    println!(
        "Hola {}! Nivel {} · {} monedas · {} XP",
        profile.username, profile.level, profile.coins, profile.xp
    );

    if app.auth.stored_level().await?.is_none() {
        let raw = prompt(&mut input, "Nivel educativo (inicial/primaria/secundaria): ").await?;
        app.auth.select_level(EducationLevel::normalize(&raw)).await?;
    }

    match app.auth.available_modules().await {
        Ok(modules) => {
            println!("Módulos disponibles:");
            for module in modules {
                println!("  {} {} ({})", module.icon, module.title, module.id);
            }
        }
        Err(e) => tracing::warn!("Module catalogue unavailable: {:#}", e),
    }

    loop {
        let choice = prompt(&mut input, "Juego (id, 'salir' para terminar): ").await?;
        let delay = app.config.feedback_delay_override;
        let played = match choice.as_str() {
            "salir" | "" => break,
            "coin_recognition" => play_rounds(CoinRecognition::new(), delay, &mut input).await?,
            "counting_money" => play_rounds(CountingMoney::new(), delay, &mut input).await?,
            "needs_wants" => play_rounds(NeedsWants::new(), delay, &mut input).await?,
            "piggy_bank" => play_rounds(PiggyBankStory::new(), delay, &mut input).await?,
            "debt_game" => play_rounds(DebtScenarios::new(), delay, &mut input).await?,
            "savings_challenge" => play_savings(&mut input).await?,
            "lemonade_stand" => play_lemonade(&mut input).await?,
            "simple_interest" => play_interest(&mut input).await?,
            other => {
                println!("Juego desconocido: {}", other);
                continue;
            }
        };

        if let Some(finished) = played {
            commit_with_retry(&app, finished, &mut input).await?;
        }
    }

    app.auth.persist_profile().await?;
    Ok(())
}

/// A finished game ready to be committed
struct Finished {
    definition: GameDefinition,
    score: ScoreResult,
    reward: RewardGrant,
}

async fn prompt(input: &mut Input, label: &str) -> Result<String> {
    println!("{}", label);
    let line = input
        .next_line()
        .await
        .context("Failed to read input")?
        .ok_or_else(|| anyhow!("Input closed"))?;
    Ok(line.trim().to_string())
}

async fn prompt_number(input: &mut Input, label: &str) -> Result<f64> {
    loop {
        let raw = prompt(input, label).await?;
        match raw.replace(',', ".").parse::<f64>() {
            Ok(value) => return Ok(value),
            Err(_) => println!("Escribe un número"),
        }
    }
}

async fn sign_in(app: &AppState, input: &mut Input) -> Result<finanzas_game_core::models::UserProfile> {
    loop {
        let username = prompt(input, "Nombre de usuario: ").await?;
        match app.auth.login(&username).await {
            Ok(profile) => return Ok(profile),
            Err(e) => tracing::info!("Login failed, offering registration: {:#}", e),
        }

        let age = prompt_number(input, "Usuario nuevo. ¿Cuántos años tienes? ").await?;
        match app.auth.register(&username, age as u32).await {
            Ok(profile) => return Ok(profile),
            Err(e) => println!("No se pudo registrar: {:#}", e),
        }
    }
}

/// How a round is shown on the console and how a typed answer is read back
trait ConsoleRound: MiniGame {
    fn render(round: &Self::Round) -> String;
    fn parse(round: &Self::Round, raw: &str) -> Option<Self::Choice>;
}

impl ConsoleRound for CoinRecognition {
    fn render(round: &CoinRound) -> String {
        let options: Vec<&str> = round.options.iter().map(|coin| coin.id).collect();
        format!("Encuentra: {} → [{}]", round.target.name, options.join(", "))
    }

    fn parse(_round: &CoinRound, raw: &str) -> Option<String> {
        Some(raw.to_string())
    }
}

impl ConsoleRound for CountingMoney {
    fn render(round: &CountingRound) -> String {
        format!(
            "{} monedas + {} monedas = ? {:?}",
            round.coin1, round.coin2, round.options
        )
    }

    fn parse(_round: &CountingRound, raw: &str) -> Option<u32> {
        raw.parse().ok()
    }
}

impl ConsoleRound for NeedsWants {
    fn render(round: &Item) -> String {
        format!("{}: ¿necesidad (n) o deseo (d)?", round.name)
    }

    fn parse(_round: &Item, raw: &str) -> Option<Category> {
        match raw {
            "n" => Some(Category::Need),
            "d" => Some(Category::Want),
            _ => None,
        }
    }
}

impl ConsoleRound for PiggyBankStory {
    fn render(round: &Question) -> String {
        let mut text = round.prompt.to_string();
        for (i, option) in round.options.iter().enumerate() {
            text.push_str(&format!("\n  {}) {}", i + 1, option));
        }
        text
    }

    fn parse(round: &Question, raw: &str) -> Option<usize> {
        let picked = raw.parse::<usize>().ok()?;
        (1..=round.options.len()).contains(&picked).then(|| picked - 1)
    }
}

impl ConsoleRound for DebtScenarios {
    fn render(round: &Scenario) -> String {
        format!(
            "{}\n{}\n  p) Pedir prestado  a) Ahorrar  c) Pedir ayuda",
            round.title, round.situation
        )
    }

    fn parse(_round: &Scenario, raw: &str) -> Option<DebtAnswer> {
        match raw {
            "p" => Some(DebtAnswer::Borrow),
            "a" => Some(DebtAnswer::Save),
            "c" => Some(DebtAnswer::Ask),
            _ => None,
        }
    }
}

async fn play_rounds<G: ConsoleRound>(
    game: G,
    feedback_delay: Option<std::time::Duration>,
    input: &mut Input,
) -> Result<Option<Finished>> {
    let definition = game.definition().clone();
    if definition.module_id.as_str() == "piggy_bank" {
        for page in finanzas_game_core::games::piggy_bank::STORY {
            println!("{}", page);
        }
    }

    let engine = RoundEngine::with_options(
        game,
        EngineOptions {
            feedback_delay,
            seed: None,
        },
    );
    let mut views = engine.subscribe();
    engine.start().await?;

    loop {
        let view = views.borrow_and_update().clone();
        match view.phase {
            GamePhase::Summary => break,
            GamePhase::Intro => return Ok(None),
            GamePhase::Playing if view.is_awaiting_answer() => {
                let Some(round) = view.round.as_ref() else {
                    return Ok(None);
                };
                println!("[{}/{}] {}", view.index + 1, view.length, G::render(round));
                let raw = prompt(input, ">").await?;
                if raw == "salir" {
                    engine.cancel().await;
                    return Ok(None);
                }
                let Some(choice) = G::parse(round, &raw) else {
                    println!("Respuesta no válida");
                    continue;
                };
                if let Some(feedback) = engine.submit_answer(choice).await {
                    match (feedback.correct, feedback.explanation) {
                        (true, _) => println!("¡Correcto!"),
                        (false, Some(why)) => println!("Incorrecto. {}", why),
                        (false, None) => println!("Incorrecto"),
                    }
                }
            }
            GamePhase::Playing => {
                views.changed().await.context("Round engine stopped")?;
            }
        }
    }

    let Some(score) = engine.score() else {
        return Ok(None);
    };
    show_summary(&score);
    let reward = definition.reward.grant(&score);
    Ok(Some(Finished {
        definition,
        score,
        reward,
    }))
}

fn show_summary(score: &ScoreResult) {
    let headline = match score.tier() {
        SummaryTier::Perfect => "¡Perfecto!",
        SummaryTier::Good => "¡Muy bien!",
        SummaryTier::KeepTrying => "¡Sigue practicando!",
    };
    println!(
        "{} {}/{} ({}%)",
        headline, score.correct, score.total, score.percentage
    );
}

fn finish_simulation<S: Simulation>(simulation: &S) -> Option<Finished> {
    let score = simulation.result()?;
    show_summary(&score);
    Some(Finished {
        definition: simulation.definition().clone(),
        reward: simulation.reward(&score),
        score,
    })
}

async fn play_savings(input: &mut Input) -> Result<Option<Finished>> {
    let mut game = SavingsChallenge::new();
    loop {
        let name = prompt(input, "¿Para qué quieres ahorrar? ").await?;
        let amount = prompt_number(input, "¿Cuánto cuesta? (5-100) ").await?;
        match game.set_goal(&name, amount) {
            Ok(()) => break,
            Err(e) => println!("{}", e),
        }
    }

    while game.result().is_none() {
        let amount = prompt_number(input, "¿Cuánto ahorras esta semana? (0-10) ").await?;
        match game.save_week(amount) {
            Ok(week) => println!(
                "Semana {}: ahorraste {:.2}, llevas {:.2}",
                week.week, week.saved, week.total_saved
            ),
            Err(e) => println!("{}", e),
        }
    }
    Ok(finish_simulation(&game))
}

async fn play_lemonade(input: &mut Input) -> Result<Option<Finished>> {
    let mut game = LemonadeStand::new();
    while !game.is_finished() {
        if let Some(event) = game.todays_event() {
            println!(
                "Día {} · Dinero {:.2} · {}",
                game.current_day(),
                game.money(),
                event.description()
            );
        }
        let investment = prompt_number(input, "¿Cuánto inviertes? ").await?;
        let expected = prompt_number(input, "¿Cuánto esperas vender? ").await?;
        match game.play_day(investment, expected) {
            Ok(day) => println!("Vendiste {:.2}, ganancia {:.2}", day.revenue, day.profit),
            Err(e) => println!("{}", e),
        }
    }
    Ok(finish_simulation(&game))
}

async fn play_interest(input: &mut Input) -> Result<Option<Finished>> {
    let mut game = InterestCalculator::new();
    loop {
        let principal = prompt_number(input, "Capital inicial: ").await?;
        let rate = prompt_number(input, "Tasa anual (%): ").await?;
        let years = prompt_number(input, "Años (1-10): ").await?;
        match game.calculate(principal, rate, years as u32) {
            Ok(rows) => {
                for row in rows {
                    println!("Año {}: interés {:.2}, total {:.2}", row.year, row.interest, row.balance);
                }
                break;
            }
            Err(e) => println!("{}", e),
        }
    }
    game.compare()?;
    if let Some(difference) = game.difference() {
        println!("Con interés compuesto ganas {:.2} más", difference);
    }
    Ok(finish_simulation(&game))
}

async fn commit_with_retry(app: &AppState, finished: Finished, input: &mut Input) -> Result<()> {
    let Some(profile) = app.profile.current() else {
        return Err(anyhow!("No user signed in"));
    };

    let mut request = CommitRequest::new(
        profile.id,
        finished.definition.module_id.clone(),
        finished.score,
        finished.reward,
        finished.definition.badges.clone(),
    );

    loop {
        match app.committer.commit(&mut request).await {
            CommitOutcome::Committed(receipt) => {
                println!(
                    "Guardado: +{} monedas, +{} XP",
                    request.reward.coins, request.reward.xp
                );
                if let Some(level_up) = receipt.level_up {
                    println!(
                        "¡Subiste al nivel {}! +{} monedas de bonificación",
                        level_up.new_level, level_up.bonus_coins
                    );
                }
                for badge in &receipt.unlocked_badges {
                    println!("Nueva insignia: {}", badge);
                }
                app.auth.persist_profile().await?;
                return Ok(());
            }
            CommitOutcome::Failed(failure) => {
                println!("No se pudo guardar el progreso ({})", failure.error);
                let answer = prompt(input, "¿Reintentar? (s/n) ").await?;
                if answer != "s" {
                    tracing::warn!(
                        "Progress for {} left uncommitted after {}",
                        request.module_id,
                        failure.step
                    );
                    return Ok(());
                }
            }
        }
    }
}
