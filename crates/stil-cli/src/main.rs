use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use stil_contracts::analytics::{intent_label, ReturnAnalytics};
use stil_contracts::catalog::{rewrite_image_path, Product};
use stil_contracts::chat::{render_message, Sender};
use stil_engine::{
    api_base_from_env, HttpGateway, ReportState, SlotStatus, StilEngine, WorkflowKind,
    DEFAULT_POLL_INTERVAL,
};

#[derive(Debug, Parser)]
#[command(name = "stil-rs", version, about = "StilDöngüsü styling assistant CLI")]
struct Cli {
    /// Base URL of the styling service; falls back to STIL_API_BASE.
    #[arg(long)]
    api_base: Option<String>,
    /// JSONL event log path.
    #[arg(long, default_value = "stil-events.jsonl")]
    events: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze one garment photo and print styling advice.
    Analyze(AnalyzeArgs),
    /// Build a style profile from several outfit photos.
    Profile(ProfileArgs),
    /// Request outfit combinations for an event or invitation.
    Event(EventArgs),
    /// Open the return-assistant conversation for a product.
    Chat(ChatArgs),
    /// Look up the fit score for a body type and product.
    Fit(FitArgs),
    /// Fetch one product record.
    Product(ProductArgs),
    /// Watch the return-analytics report refresh on an interval.
    Dashboard(DashboardArgs),
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    #[arg(long)]
    file: Option<PathBuf>,
    /// Also request the follow-on combo visualization.
    #[arg(long)]
    combo: bool,
}

#[derive(Debug, Parser)]
struct ProfileArgs {
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    files: Vec<PathBuf>,
}

#[derive(Debug, Parser)]
struct EventArgs {
    #[arg(long)]
    request: String,
}

#[derive(Debug, Parser)]
struct ChatArgs {
    /// Product name the return conversation is about.
    #[arg(long)]
    product: String,
}

#[derive(Debug, Parser)]
struct FitArgs {
    #[arg(long)]
    body_type: String,
    #[arg(long)]
    product_id: u64,
}

#[derive(Debug, Parser)]
struct ProductArgs {
    #[arg(long)]
    id: u64,
}

#[derive(Debug, Parser)]
struct DashboardArgs {
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    interval_secs: u64,
    /// Number of report frames to print before exiting (0 runs until killed).
    #[arg(long, default_value_t = 1)]
    refreshes: u64,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("stil-rs error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let api_base = cli.api_base.unwrap_or_else(api_base_from_env);
    let gateway = Arc::new(HttpGateway::new(api_base));
    let mut engine = StilEngine::new(gateway, &cli.events);
    match cli.command {
        Command::Analyze(args) => run_analyze(&mut engine, args),
        Command::Profile(args) => run_profile(&mut engine, args),
        Command::Event(args) => run_event(&mut engine, args),
        Command::Chat(args) => run_chat(&mut engine, args),
        Command::Fit(args) => run_fit(&mut engine, args),
        Command::Product(args) => run_product(&mut engine, args),
        Command::Dashboard(args) => run_dashboard(&engine, args),
    }
}

fn run_analyze(engine: &mut StilEngine, args: AnalyzeArgs) -> Result<i32> {
    engine.run_single_analysis(args.file.as_deref())?;
    let slot = engine.bench().slot(WorkflowKind::SingleAnalysis);
    if let Some(message) = &slot.validation_error {
        eprintln!("{message}");
        return Ok(2);
    }
    if slot.status == SlotStatus::Failed {
        if let Some(message) = &slot.error {
            eprintln!("{message}");
        }
        return Ok(1);
    }
    if let Some(analysis) = slot.analysis() {
        println!("✨ {}", analysis.style_advice.title);
        println!("{}", analysis.style_advice.vibe_description);
        println!();
        println!("Kombin mantığı: {}", analysis.style_advice.combination_logic);
        println!("İpucu: {}", analysis.style_advice.pro_tip);
        if !analysis.matched_products.is_empty() {
            println!();
            println!("Eşleşen ürünler:");
            for product in &analysis.matched_products {
                print_product_line(product);
            }
        }
    }
    if args.combo {
        engine.run_visual_combo()?;
        if let Some(combo) = engine.bench().combo() {
            println!();
            println!("Kombin görseli: {}", combo.image_description);
        } else if let Some(message) = engine.bench().combo_error() {
            eprintln!("{message}");
        }
    }
    Ok(0)
}

fn run_profile(engine: &mut StilEngine, args: ProfileArgs) -> Result<i32> {
    engine.run_style_profile(&args.files)?;
    let slot = engine.bench().slot(WorkflowKind::ProfileAnalysis);
    if let Some(message) = &slot.validation_error {
        eprintln!("{message}");
        return Ok(2);
    }
    if slot.status == SlotStatus::Failed {
        if let Some(message) = &slot.error {
            eprintln!("{message}");
        }
        return Ok(1);
    }
    if let Some(profile) = slot.profile() {
        println!("{}", profile.summary);
        if !profile.style_profile.is_empty() {
            println!();
            println!("Stil radarı:");
            for mix in &profile.style_profile {
                println!("  {:>5.1}%  {}", mix.percentage, mix.style);
            }
        }
        if !profile.dominant_colors.is_empty() {
            println!("Baskın renkler: {}", profile.dominant_colors.join(", "));
        }
    }
    Ok(0)
}

fn run_event(engine: &mut StilEngine, args: EventArgs) -> Result<i32> {
    engine.run_event_stylist(&args.request)?;
    let slot = engine.bench().slot(WorkflowKind::EventStylist);
    if let Some(message) = &slot.validation_error {
        eprintln!("{message}");
        return Ok(2);
    }
    if slot.status == SlotStatus::Failed {
        if let Some(message) = &slot.error {
            eprintln!("{message}");
        }
        return Ok(1);
    }
    if let Some(combos) = slot.combos() {
        for (index, combination) in combos.combinations.iter().enumerate() {
            if index > 0 {
                println!();
            }
            println!("{}. {}", index + 1, combination.title);
            for item in &combination.items {
                println!("   - {item}");
            }
            if !combination.description.is_empty() {
                println!("   {}", combination.description);
            }
        }
    }
    Ok(0)
}

fn run_chat(engine: &mut StilEngine, args: ChatArgs) -> Result<i32> {
    if !engine.open_chat(&args.product)? {
        eprintln!("stil-rs: ürün adı boş olamaz");
        return Ok(2);
    }
    print_new_bot_messages(engine, 0);
    let mut printed = transcript_len(engine);
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim();
        if text.eq_ignore_ascii_case("exit") {
            break;
        }
        engine.send_chat(text)?;
        print_new_bot_messages(engine, printed);
        printed = transcript_len(engine);
    }
    engine.close_chat()?;
    Ok(0)
}

fn transcript_len(engine: &StilEngine) -> usize {
    engine
        .chat()
        .map(|session| session.transcript().len())
        .unwrap_or(0)
}

fn print_new_bot_messages(engine: &StilEngine, from: usize) {
    let Some(session) = engine.chat() else {
        return;
    };
    for message in session.transcript().iter().skip(from) {
        if message.sender == Sender::Bot {
            println!("{}", render_message(&message.text));
        }
    }
}

fn run_fit(engine: &mut StilEngine, args: FitArgs) -> Result<i32> {
    engine.load_product(args.product_id)?;
    if let Some(product) = &engine.product_view().product {
        println!("{} ({})", product.name, product.price);
    }
    engine.query_fit(&args.body_type, args.product_id)?;
    match engine.fit().score() {
        Some(score) => {
            println!("Uyum puanı: {}/10", score.score_display());
            println!("{}", score.reasoning);
            Ok(0)
        }
        None => {
            eprintln!("stil-rs: vücut tipi boş olamaz");
            Ok(2)
        }
    }
}

fn run_product(engine: &mut StilEngine, args: ProductArgs) -> Result<i32> {
    engine.load_product(args.id)?;
    let view = engine.product_view();
    if let Some(message) = &view.error {
        eprintln!("{message}");
        return Ok(1);
    }
    if let Some(product) = &view.product {
        print_product_line(product);
    }
    Ok(0)
}

fn run_dashboard(engine: &StilEngine, args: DashboardArgs) -> Result<i32> {
    let interval = Duration::from_secs(args.interval_secs.max(1));
    let mut poller = engine.start_poller(interval);
    // Give the immediate first fetch a moment to land before the first frame.
    thread::sleep(Duration::from_millis(500));
    let mut frames = 0u64;
    loop {
        print_report(&poller.report());
        frames += 1;
        if args.refreshes != 0 && frames >= args.refreshes {
            break;
        }
        thread::sleep(interval);
    }
    poller.stop();
    Ok(0)
}

fn print_report(state: &ReportState) {
    let report = match &state.snapshot {
        Some(report) => report,
        None => {
            match &state.last_error {
                Some(message) => eprintln!("{message}"),
                None => println!("Rapor yükleniyor..."),
            }
            return;
        }
    };
    if let Some(message) = &state.last_error {
        eprintln!("{message}");
    }
    print_analytics(report);
}

fn print_analytics(report: &ReturnAnalytics) {
    if report.is_empty() {
        println!("Harika Haber! Sistemde henüz hiç iade talebi bulunmuyor.");
        return;
    }
    println!("Toplam iade: {}", report.total_returns);
    for product in &report.product_analysis {
        println!();
        println!("{} ({} iade)", product.product_name, product.total_returns);
        for reason in &product.reasons {
            println!(
                "  {:>5.1}%  {} ({})",
                reason.percentage,
                intent_label(&reason.intent),
                reason.count
            );
        }
        if !product.strategic_advice.common_theme.is_empty() {
            println!("  Ortak tema: {}", product.strategic_advice.common_theme);
        }
        if !product.strategic_advice.actionable_advice.is_empty() {
            println!("  Öneri: {}", product.strategic_advice.actionable_advice);
        }
    }
}

fn print_product_line(product: &Product) {
    println!(
        "  [{}] {} | {} | {}",
        product.id,
        product.name,
        product.price,
        rewrite_image_path(&product.image)
    );
    if !product.style_tags.is_empty() {
        println!("      etiketler: {}", product.style_tags.join(", "));
    }
}
