use crate::cli::opts::*;
use crate::stores::{CardsStore, DecksStore};

use anyhow::{anyhow, Result};
use memvocab_core::{Card, CardPatch, CardRepository, Deck, DeckPatch, DeckWithAmount};
use memvocab_store::{
    CardStore, DeckStore, SeedDelay, SeedService, VocabDb, DEFAULT_DECK_ID,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

pub struct AppContext {
    pub deck_repo: DeckStore,
    pub card_repo: CardStore,
    pub decks: Arc<DecksStore>,
    pub cards: Arc<CardsStore>,
    pub seeder: Arc<SeedService>,
}

pub async fn open_context(args: &Cli) -> Result<AppContext> {
    let db = if args.ephemeral {
        VocabDb::in_memory()
    } else if let Some(path) = &args.db_path {
        let backups = path
            .parent()
            .map(|p| p.join("backups"))
            .unwrap_or_else(|| PathBuf::from("backups"));
        VocabDb::open_with(path.clone(), backups, 10).await?
    } else {
        VocabDb::open_default().await?
    };
    let db = Arc::new(db);

    let deck_repo = DeckStore::new(db.clone());
    let card_repo = CardStore::new(db);
    let delay = if args.no_delay {
        SeedDelay::None
    } else {
        SeedDelay::Simulated
    };
    let seeder = Arc::new(SeedService::with_delay(
        deck_repo.clone(),
        card_repo.clone(),
        delay,
    ));

    Ok(AppContext {
        decks: Arc::new(DecksStore::new(Arc::new(deck_repo.clone()), seeder.clone())),
        cards: Arc::new(CardsStore::new(Arc::new(card_repo.clone()), seeder.clone())),
        deck_repo,
        card_repo,
        seeder,
    })
}

pub async fn run_cli(args: Cli) -> Result<()> {
    let ctx = open_context(&args).await?;
    match args.cmd {
        Command::Deck(cmd) => deck_cmd(&ctx, cmd).await,
        Command::Card(cmd) => card_cmd(&ctx, cmd).await,
        Command::Seed => seed_cmd(&ctx).await,
        Command::Import { deck, path } => import_cmd(&ctx, &deck, &path).await,
        Command::Export { deck, path } => export_cmd(&ctx, &deck, &path).await,
        Command::Watch { deck } => watch_cmd(&ctx, deck.as_deref()).await,
    }
}

async fn deck_cmd(ctx: &AppContext, cmd: DeckCmd) -> Result<()> {
    match cmd {
        DeckCmd::List => {
            // Mirrors the app's landing view: first mount seeds an empty store.
            ctx.decks.initialize().await;
            let snap = ctx.decks.snapshot();
            if let Some(err) = snap.error {
                return Err(anyhow!(err));
            }
            for d in snap.decks {
                print_deck(&d);
            }
        }
        DeckCmd::Add(a) => {
            let mut deck = Deck::new(a.topic, a.language_from, a.language_to);
            deck.description = a.description;
            deck.prompt_to_ai_agent = a.prompt;
            let id = ctx.decks.create_deck(&deck).await?;
            println!("{id}");
        }
        DeckCmd::Rm { deck_id } => {
            ctx.decks.delete_deck(&deck_id).await?;
            println!("ok");
        }
        DeckCmd::Edit(e) => {
            let patch = DeckPatch {
                topic: e.topic,
                description: e.description,
                language_from: e.language_from,
                language_to: e.language_to,
                prompt_to_ai_agent: e.prompt,
            };
            ctx.decks.update_deck(&e.deck_id, patch).await?;
            println!("ok");
        }
        DeckCmd::Search { query } => {
            for d in ctx.decks.search_decks(&query).await? {
                print_deck(&d);
            }
        }
    }
    Ok(())
}

async fn card_cmd(ctx: &AppContext, cmd: CardCmd) -> Result<()> {
    match cmd {
        CardCmd::List { deck } => {
            ctx.cards.load_cards(&deck).await?;
            for c in ctx.cards.snapshot().cards {
                print_card(&c);
            }
        }
        CardCmd::Add(a) => {
            let deck = ctx
                .decks
                .get_deck_by_id(&a.deck)
                .await?
                .ok_or_else(|| anyhow!("no such deck: {}", a.deck))?;
            let mut card = Card::new(deck.deck.id.clone(), a.source, a.target);
            card.source_language = a.source_lang.unwrap_or(deck.deck.language_from);
            card.target_language = a.target_lang.unwrap_or(deck.deck.language_to);
            card.pronunciation = a.pronunciation;
            card.remark = a.remark;
            let id = ctx.card_repo.add(&card).await?;
            println!("{id}");
        }
        CardCmd::Rm { card_id } => {
            ctx.card_repo.delete(&card_id).await?;
            println!("ok");
        }
        CardCmd::Edit(e) => {
            let patch = CardPatch {
                deck_id: None,
                source_word: e.source,
                target_word: e.target,
                source_language: e.source_lang,
                target_language: e.target_lang,
                pronunciation: e.pronunciation,
                remark: e.remark,
            };
            let affected = ctx.card_repo.update(&e.card_id, patch).await?;
            println!("{affected} updated");
        }
        CardCmd::Search { query, deck } => {
            for c in ctx.cards.search_cards(&query, deck.as_deref()).await? {
                print_card(&c);
            }
        }
    }
    Ok(())
}

async fn seed_cmd(ctx: &AppContext) -> Result<()> {
    let decks = ctx.seeder.ensure_default_decks().await?;
    let cards = ctx.seeder.ensure_default_cards(DEFAULT_DECK_ID).await?;
    println!("{} decks, {} cards in {DEFAULT_DECK_ID}", decks.len(), cards.len());
    Ok(())
}

/// Accepts the card shape the editing UI uploads: `deckId` and `id` may be
/// absent, the caller (us) stamps them before the bulk replace.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportedCard {
    #[serde(default)]
    id: Option<String>,
    source_language: String,
    target_language: String,
    source_word: String,
    target_word: String,
    #[serde(default)]
    pronunciation: String,
    #[serde(default)]
    remark: Option<String>,
}

async fn import_cmd(ctx: &AppContext, deck_id: &str, path: &PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(path)?;
    let imported: Vec<ImportedCard> = serde_json::from_str(&raw)?;

    let cards: Vec<Card> = imported
        .into_iter()
        .map(|c| Card {
            id: c.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            deck_id: deck_id.to_string(),
            source_language: c.source_language,
            target_language: c.target_language,
            source_word: c.source_word,
            target_word: c.target_word,
            pronunciation: c.pronunciation,
            remark: c.remark,
        })
        .collect();

    ctx.cards.save_cards(&cards, Some(deck_id)).await?;
    println!("{} cards imported into {deck_id}", cards.len());
    Ok(())
}

async fn export_cmd(ctx: &AppContext, deck_id: &str, path: &PathBuf) -> Result<()> {
    let cards = ctx.card_repo.get_by_deck(deck_id).await?;
    std::fs::write(path, serde_json::to_vec_pretty(&cards)?)?;
    println!("{} cards written to {}", cards.len(), path.display());
    Ok(())
}

async fn watch_cmd(ctx: &AppContext, deck: Option<&str>) -> Result<()> {
    match deck {
        Some(deck_id) => {
            let mut live = ctx.card_repo.live_by_deck(deck_id);
            println!("watching cards of {deck_id} (Ctrl-C to stop)");
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    snap = live.next() => {
                        let Some(cards) = snap else { break };
                        println!("-- {} cards", cards.len());
                        for c in cards {
                            print_card(&c);
                        }
                    }
                }
            }
        }
        None => {
            let mut live = ctx.deck_repo.live_all();
            println!("watching decks (Ctrl-C to stop)");
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    snap = live.next() => {
                        let Some(decks) = snap else { break };
                        println!("-- {} decks", decks.len());
                        for d in decks {
                            print_deck(&d);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_deck(d: &DeckWithAmount) {
    println!(
        "{}\t{}\t{} → {}\t{} cards",
        d.deck.id, d.deck.topic, d.deck.language_from, d.deck.language_to, d.amount
    );
}

fn print_card(c: &Card) {
    println!(
        "{}\t{}\t{}\t{}\t{}",
        c.id,
        c.source_word,
        c.target_word,
        c.pronunciation,
        c.remark.as_deref().unwrap_or("-")
    );
}
