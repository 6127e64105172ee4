//! crates/flashdeck_core/src/service.rs
//!
//! The study operations exposed to the boundary. Every operation takes the
//! authenticated user explicitly, and each review step runs as a single
//! read-modify-persist transaction on the user's cards.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::domain::{
    CardCommand, CardDraft, CardId, CommandOutcome, DailyProgress, DraftMode, FlashCard,
    NavigationResult, NewCard, Side, UserId, DEFAULT_REVISION_THRESHOLD,
};
use crate::grading::grade;
use crate::navigator::{previous_card_id, reset_pass, select_card, TopicSelector};
use crate::ports::{CardStore, PortError, PortResult};
use crate::stats::daily_progress;
use crate::token::{TokenCodec, NEXT_TOKEN};
use crate::topics::{aggregate, TopicAggregate};

pub struct StudyService {
    cards: Arc<dyn CardStore>,
    codec: TokenCodec,
    revision_threshold: u8,
    rng: Mutex<StdRng>,
}

impl StudyService {
    pub fn new(cards: Arc<dyn CardStore>, codec: TokenCodec) -> Self {
        Self {
            cards,
            codec,
            revision_threshold: DEFAULT_REVISION_THRESHOLD,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn with_revision_threshold(mut self, threshold: u8) -> Self {
        self.revision_threshold = threshold;
        self
    }

    /// Replaces the card-selection randomness, e.g. with a seeded generator.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    //=====================================================================================
    // Topics and dashboard
    //=====================================================================================

    /// Lists the user's topics. Opening the topic list starts a fresh pass over
    /// every card, so this resets and persists all `seen` flags.
    pub async fn list_topics(&self, user_id: UserId) -> PortResult<TopicAggregate> {
        let threshold = self.revision_threshold;
        let mut topics = None;
        let mut op = |cards: &mut [FlashCard]| -> PortResult<()> {
            reset_pass(cards.iter_mut());
            topics = Some(aggregate(cards, threshold));
            Ok(())
        };
        self.cards.modify_user_cards(user_id, &mut op).await?;
        topics.ok_or_else(|| PortError::Unexpected("topic listing produced no result".to_string()))
    }

    pub async fn dashboard(&self, user_id: UserId, today: NaiveDate) -> PortResult<DailyProgress> {
        let cards = self.cards.list_cards_by_user(user_id).await?;
        Ok(daily_progress(&cards, today, self.revision_threshold))
    }

    //=====================================================================================
    // Review navigation
    //=====================================================================================

    /// Shows the card named by `token`, or draws the next one for `"next"` and
    /// for tokens that do not resolve to a card in the topic.
    pub async fn view_card(
        &self,
        user_id: UserId,
        topic: &str,
        token: &str,
        side: Side,
        now: DateTime<Utc>,
    ) -> PortResult<NavigationResult> {
        let requested = self.codec.decode(token);
        if requested.is_none() && token != NEXT_TOKEN {
            debug!("Unresolvable card token for topic '{}', drawing a card instead", topic);
        }
        self.navigate(user_id, topic, side, now, |_| Ok(requested)).await
    }

    /// Shows the same card with the other side up.
    pub async fn flip_card(
        &self,
        user_id: UserId,
        topic: &str,
        token: &str,
        side: Side,
        now: DateTime<Utc>,
    ) -> PortResult<NavigationResult> {
        self.view_card(user_id, topic, token, side.flipped(), now).await
    }

    /// Draws a new card, ignoring whatever is currently displayed.
    pub async fn next_card(&self, user_id: UserId, topic: &str, now: DateTime<Utc>) -> PortResult<NavigationResult> {
        self.view_card(user_id, topic, NEXT_TOKEN, Side::Question, now).await
    }

    /// Steps back one card in viewing history, question side up.
    pub async fn previous_card(
        &self,
        user_id: UserId,
        topic: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> PortResult<NavigationResult> {
        let current = self.codec.decode(token);
        let threshold = self.revision_threshold;
        self.navigate(user_id, topic, Side::Question, now, |cards| {
            let selector = TopicSelector::resolve(topic, cards);
            let candidates = cards.iter().filter(|c| selector.matches(c, threshold));
            previous_card_id(candidates, current)
                .map(Some)
                .ok_or_else(|| PortError::NoHistory(topic.to_string()))
        })
        .await
    }

    /// Records a right or wrong answer for the card behind `token`, then shows
    /// that card again question side up.
    pub async fn grade_card(
        &self,
        user_id: UserId,
        topic: &str,
        token: &str,
        correct: bool,
        now: DateTime<Utc>,
    ) -> PortResult<NavigationResult> {
        let card_id = self
            .codec
            .decode(token)
            .ok_or_else(|| PortError::NotFound("Card not found".to_string()))?;

        let mut op = |cards: &mut [FlashCard]| -> PortResult<()> {
            let card = cards
                .iter_mut()
                .find(|c| c.id == card_id)
                .ok_or_else(|| PortError::NotFound(format!("Card {} not found", card_id)))?;
            grade(card, correct);
            debug!(card_id, correct, ease = card.ease, "graded card");
            Ok(())
        };
        self.cards.modify_user_cards(user_id, &mut op).await?;

        self.view_card(user_id, topic, token, Side::Question, now).await
    }

    /// Resolves the topic, lets `pick` choose an explicit card, and runs the
    /// selection, all inside one store transaction.
    async fn navigate<F>(
        &self,
        user_id: UserId,
        topic: &str,
        side: Side,
        now: DateTime<Utc>,
        pick: F,
    ) -> PortResult<NavigationResult>
    where
        F: Fn(&[FlashCard]) -> PortResult<Option<CardId>> + Send + Sync,
    {
        let threshold = self.revision_threshold;
        let mut result = None;
        let mut op = |cards: &mut [FlashCard]| -> PortResult<()> {
            let requested = pick(&*cards)?;
            let selector = TopicSelector::resolve(topic, cards);
            let mut candidates: Vec<&mut FlashCard> = cards
                .iter_mut()
                .filter(|c| selector.matches(c, threshold))
                .collect();

            let mut rng = self
                .rng
                .lock()
                .map_err(|_| PortError::Unexpected("card selection rng poisoned".to_string()))?;
            let selection = select_card(&mut candidates, requested, now, &mut *rng)
                .ok_or_else(|| PortError::NoCardsFound(topic.to_string()))?;
            drop(rng);

            if selection.pass_reset {
                info!("Topic '{}' completed a pass of {} cards", topic, selection.total);
            }
            let card = candidates
                .iter()
                .find(|c| c.id == selection.card_id)
                .map(|c| (**c).clone())
                .ok_or_else(|| PortError::Unexpected("selected card vanished".to_string()))?;

            result = Some(NavigationResult {
                topic: topic.to_string(),
                token: self.codec.encode(card.id),
                card,
                side,
                total: selection.total,
                complete: selection.complete,
            });
            Ok(())
        };
        self.cards.modify_user_cards(user_id, &mut op).await?;
        result.ok_or_else(|| PortError::Unexpected("navigation produced no card".to_string()))
    }

    //=====================================================================================
    // Card management
    //=====================================================================================

    pub async fn execute(&self, user_id: UserId, command: CardCommand) -> PortResult<CommandOutcome> {
        match command {
            CardCommand::Add { topic, question, answer } => self
                .add_card(user_id, &topic, &question, &answer)
                .await
                .map(CommandOutcome::Saved),
            CardCommand::Edit {
                card_id,
                topic,
                question,
                answer,
            } => self
                .edit_card(user_id, card_id, &topic, &question, &answer)
                .await
                .map(CommandOutcome::Saved),
            CardCommand::Delete { card_id } => self
                .delete_card(user_id, card_id)
                .await
                .map(|_| CommandOutcome::Deleted(card_id)),
        }
    }

    pub async fn add_card(&self, user_id: UserId, topic: &str, question: &str, answer: &str) -> PortResult<FlashCard> {
        let card = self.cards.create_card(user_id, NewCard::new(topic, question, answer)?).await?;
        info!("User {} added card {} to '{}'", user_id, card.id, card.topic);
        Ok(card)
    }

    pub async fn edit_card(
        &self,
        user_id: UserId,
        card_id: CardId,
        topic: &str,
        question: &str,
        answer: &str,
    ) -> PortResult<FlashCard> {
        let content = NewCard::new(topic, question, answer)?;
        let mut card = self.owned_card(user_id, card_id).await?;
        card.topic = content.topic;
        card.question = content.question;
        card.answer = content.answer;
        self.cards.update_card(&card).await?;
        Ok(card)
    }

    pub async fn delete_card(&self, user_id: UserId, card_id: CardId) -> PortResult<()> {
        self.owned_card(user_id, card_id).await?;
        self.cards.delete_card(card_id).await?;
        info!("User {} deleted card {}", user_id, card_id);
        Ok(())
    }

    /// Form values for adding another card to a card's topic, or editing it.
    pub async fn card_draft(&self, user_id: UserId, card_id: CardId, mode: DraftMode) -> PortResult<CardDraft> {
        let card = self.owned_card(user_id, card_id).await?;
        let topic = title_case(&card.topic);
        Ok(match mode {
            DraftMode::NewInTopic => CardDraft {
                mode,
                card_id: None,
                topic,
                question: None,
                answer: None,
            },
            DraftMode::Edit => CardDraft {
                mode,
                card_id: Some(card.id),
                topic,
                question: Some(capitalize(&card.question)),
                answer: Some(capitalize(&card.answer)),
            },
        })
    }

    /// Cards of other users are reported as missing.
    async fn owned_card(&self, user_id: UserId, card_id: CardId) -> PortResult<FlashCard> {
        let card = self.cards.get_card(card_id).await?;
        if card.user_id != user_id {
            return Err(PortError::NotFound(format!("Card {} not found", card_id)));
        }
        Ok(card)
    }
}

/// Upper-cases the first letter of every word and lower-cases the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::topics::REVISION_TOPIC;
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;

    const ALICE: UserId = 1;
    const BOB: UserId = 2;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn service(store: Arc<InMemoryStore>) -> StudyService {
        StudyService::new(store, TokenCodec::new("service test secret").unwrap())
            .with_rng(StdRng::seed_from_u64(42))
    }

    async fn setup() -> (StudyService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (service(store.clone()), store)
    }

    #[tokio::test]
    async fn listing_topics_resets_the_pass() {
        let (service, store) = setup().await;
        for q in ["a", "b", "c"] {
            service.add_card(ALICE, "Math ", q, "x").await.unwrap();
        }
        service.next_card(ALICE, "math", start()).await.unwrap();
        assert_eq!(store.list_cards_by_user(ALICE).await.unwrap().iter().filter(|c| c.seen).count(), 1);

        let topics = service.list_topics(ALICE).await.unwrap();
        assert_eq!(topics.topics["math"].len(), 3);
        assert_eq!(topics.revision.len(), 3);
        assert!(store.list_cards_by_user(ALICE).await.unwrap().iter().all(|c| !c.seen));
    }

    #[tokio::test]
    async fn listing_topics_without_cards_is_empty() {
        let (service, _) = setup().await;
        let topics = service.list_topics(ALICE).await.unwrap();
        assert!(topics.topics.is_empty());
        assert!(topics.get(REVISION_TOPIC).unwrap().is_empty());
    }

    #[tokio::test]
    async fn viewing_an_empty_topic_is_no_cards_found() {
        let (service, _) = setup().await;
        service.add_card(ALICE, "math", "q", "a").await.unwrap();
        let err = service.next_card(ALICE, "history", start()).await.unwrap_err();
        assert!(matches!(err, PortError::NoCardsFound(t) if t == "history"));
        // Another user's topic is invisible.
        assert!(matches!(
            service.next_card(BOB, "math", start()).await,
            Err(PortError::NoCardsFound(_))
        ));
    }

    #[tokio::test]
    async fn next_covers_the_topic_then_starts_over() {
        let (service, store) = setup().await;
        for q in ["1", "2", "3", "4"] {
            service.add_card(ALICE, "math", q, "a").await.unwrap();
        }
        let mut shown = HashSet::new();
        let mut previous = None;
        for step in 0..4 {
            let result = service
                .next_card(ALICE, "math", start() + Duration::seconds(step))
                .await
                .unwrap();
            assert_eq!(result.total, 4);
            assert_eq!(result.complete, step as usize + 1);
            assert_eq!(result.side, Side::Question);
            assert_ne!(Some(result.card.id), previous);
            previous = Some(result.card.id);
            shown.insert(result.card.id);
        }
        assert_eq!(shown.len(), 4);

        let result = service
            .next_card(ALICE, "math", start() + Duration::seconds(4))
            .await
            .unwrap();
        assert_eq!(result.complete, 1);
        assert_ne!(Some(result.card.id), previous);
        let seen = store.list_cards_by_user(ALICE).await.unwrap().iter().filter(|c| c.seen).count();
        assert_eq!(seen, 1);
    }

    #[tokio::test]
    async fn single_card_topic_comes_back_after_a_reset() {
        let (service, store) = setup().await;
        let card = service.add_card(ALICE, "algebra", "q", "a").await.unwrap();

        let first = service.next_card(ALICE, "algebra", start()).await.unwrap();
        assert_eq!(first.card.id, card.id);
        assert!(first.card.seen);
        assert_eq!(first.card.last_seen, Some(start()));

        let second = service
            .next_card(ALICE, "algebra", start() + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(second.card.id, card.id);
        assert_eq!(second.complete, 1);
        assert!(store.get_card(card.id).await.unwrap().seen);
    }

    #[tokio::test]
    async fn tokens_select_cards_and_bad_tokens_draw_instead() {
        let (service, _) = setup().await;
        let a = service.add_card(ALICE, "t", "qa", "aa").await.unwrap();
        service.add_card(ALICE, "t", "qb", "ab").await.unwrap();
        let token = service.codec().encode(a.id);

        let shown = service.view_card(ALICE, "t", &token, Side::Answer, start()).await.unwrap();
        assert_eq!(shown.card.id, a.id);
        assert_eq!(shown.token, token);
        assert_eq!(shown.side, Side::Answer);

        let flipped = service.flip_card(ALICE, "t", &token, Side::Answer, start()).await.unwrap();
        assert_eq!(flipped.card.id, a.id);
        assert_eq!(flipped.side, Side::Question);

        let drawn = service.view_card(ALICE, "t", "garbage", Side::Question, start()).await.unwrap();
        assert_eq!(drawn.total, 2);
    }

    #[tokio::test]
    async fn another_users_token_is_not_honoured() {
        let (service, _) = setup().await;
        let bobs = service.add_card(BOB, "t", "bob's", "a").await.unwrap();
        service.add_card(ALICE, "t", "alice's", "a").await.unwrap();
        let token = service.codec().encode(bobs.id);

        let shown = service.view_card(ALICE, "t", &token, Side::Question, start()).await.unwrap();
        assert_eq!(shown.card.question, "alice's");
    }

    #[tokio::test]
    async fn previous_without_history_is_no_history() {
        let (service, _) = setup().await;
        service.add_card(ALICE, "t", "q", "a").await.unwrap();
        assert!(matches!(
            service.previous_card(ALICE, "t", NEXT_TOKEN, start()).await,
            Err(PortError::NoHistory(_))
        ));
    }

    #[tokio::test]
    async fn previous_steps_back_through_what_was_shown() {
        let (service, _) = setup().await;
        for q in ["1", "2", "3"] {
            service.add_card(ALICE, "t", q, "a").await.unwrap();
        }
        let mut order = Vec::new();
        for step in 0..3 {
            let result = service.next_card(ALICE, "t", start() + Duration::seconds(step)).await.unwrap();
            order.push(result);
        }

        let back = service
            .previous_card(ALICE, "t", &order[2].token, start() + Duration::seconds(10))
            .await
            .unwrap();
        assert_eq!(back.card.id, order[1].card.id);
        assert_eq!(back.side, Side::Question);

        let wrapped = service
            .previous_card(ALICE, "t", &order[0].token, start() + Duration::seconds(11))
            .await
            .unwrap();
        assert_eq!(wrapped.card.id, order[2].card.id);

        let from_next = service
            .previous_card(ALICE, "t", NEXT_TOKEN, start() + Duration::seconds(12))
            .await
            .unwrap();
        assert_eq!(from_next.card.id, order[1].card.id);
    }

    #[tokio::test]
    async fn grading_updates_ease_and_moves_cards_out_of_revision() {
        let (service, store) = setup().await;
        let card = service.add_card(ALICE, "math", "q", "a").await.unwrap();
        let token = service.codec().encode(card.id);

        let mut last = None;
        for correct in [true, true, false, true] {
            last = Some(service.grade_card(ALICE, "math", &token, correct, start()).await.unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.card.id, card.id);
        assert_eq!(last.side, Side::Question);

        let stored = store.get_card(card.id).await.unwrap();
        assert_eq!((stored.times_seen, stored.times_correct, stored.times_wrong), (4, 3, 1));
        assert_eq!(stored.ease, 75);
        assert!(service.next_card(ALICE, "revision", start()).await.is_ok());

        service.grade_card(ALICE, "math", &token, true, start()).await.unwrap();
        assert_eq!(store.get_card(card.id).await.unwrap().ease, 80);
        assert!(matches!(
            service.next_card(ALICE, "revision - math", start()).await,
            Err(PortError::NoCardsFound(_))
        ));
    }

    #[tokio::test]
    async fn grading_someone_elses_card_is_not_found() {
        let (service, store) = setup().await;
        let card = service.add_card(BOB, "math", "q", "a").await.unwrap();
        let token = service.codec().encode(card.id);

        assert!(matches!(
            service.grade_card(ALICE, "math", &token, true, start()).await,
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(
            service.grade_card(ALICE, "math", "not-a-token", true, start()).await,
            Err(PortError::NotFound(_))
        ));
        assert_eq!(store.get_card(card.id).await.unwrap().times_seen, 0);
    }

    #[tokio::test]
    async fn revision_topics_only_serve_weak_cards() {
        let (service, store) = setup().await;
        let weak = service.add_card(ALICE, "math", "weak", "a").await.unwrap();
        let strong = service.add_card(ALICE, "math", "strong", "a").await.unwrap();
        let mut mastered = store.get_card(strong.id).await.unwrap();
        mastered.ease = 100;
        store.update_card(&mastered).await.unwrap();

        for step in 0..3 {
            let result = service
                .next_card(ALICE, "revision - math", start() + Duration::seconds(step))
                .await
                .unwrap();
            assert_eq!(result.card.id, weak.id);
            assert_eq!(result.total, 1);
        }
    }

    #[tokio::test]
    async fn card_commands_respect_ownership() {
        let (service, store) = setup().await;
        let saved = service
            .execute(
                ALICE,
                CardCommand::Add {
                    topic: "  Spanish ".into(),
                    question: " hola ".into(),
                    answer: "hello".into(),
                },
            )
            .await
            .unwrap();
        let CommandOutcome::Saved(card) = saved else {
            panic!("expected a saved card");
        };
        assert_eq!(card.topic, "spanish");
        assert_eq!(card.question, "hola");

        let edit = CardCommand::Edit {
            card_id: card.id,
            topic: "French".into(),
            question: "bonjour".into(),
            answer: "hello".into(),
        };
        assert!(matches!(service.execute(BOB, edit.clone()).await, Err(PortError::NotFound(_))));
        service.execute(ALICE, edit).await.unwrap();
        assert_eq!(store.get_card(card.id).await.unwrap().topic, "french");

        let delete = CardCommand::Delete { card_id: card.id };
        assert!(matches!(service.execute(BOB, delete.clone()).await, Err(PortError::NotFound(_))));
        assert_eq!(service.execute(ALICE, delete).await.unwrap(), CommandOutcome::Deleted(card.id));
        assert!(store.list_cards_by_user(ALICE).await.unwrap().is_empty());

        assert!(matches!(
            service.add_card(ALICE, "  ", "q", "a").await,
            Err(PortError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn drafts_prefill_the_card_form() {
        let (service, _) = setup().await;
        let card = service.add_card(ALICE, "world history", "who was first?", "nobody KNOWS").await.unwrap();

        let new = service.card_draft(ALICE, card.id, DraftMode::NewInTopic).await.unwrap();
        assert_eq!(new.topic, "World History");
        assert_eq!(new.question, None);

        let edit = service.card_draft(ALICE, card.id, DraftMode::Edit).await.unwrap();
        assert_eq!(edit.card_id, Some(card.id));
        assert_eq!(edit.question.as_deref(), Some("Who was first?"));
        assert_eq!(edit.answer.as_deref(), Some("Nobody knows"));

        assert!(service.card_draft(BOB, card.id, DraftMode::Edit).await.is_err());
    }

    #[tokio::test]
    async fn dashboard_counts_todays_cards() {
        let (service, _) = setup().await;
        service.add_card(ALICE, "t", "1", "a").await.unwrap();
        service.add_card(ALICE, "t", "2", "a").await.unwrap();
        service.next_card(ALICE, "t", start()).await.unwrap();

        let progress = service.dashboard(ALICE, start().date_naive()).await.unwrap();
        assert_eq!(progress.cards_total, 2);
        assert_eq!(progress.cards_today, 1);
        assert_eq!(progress.percent_complete, 50);
        assert_eq!(progress.revision.len(), 2);
    }

    #[tokio::test]
    async fn revision_topic_names_are_refused_and_listed_once() {
        let (service, _) = setup().await;
        service.add_card(ALICE, "math", "q", "a").await.unwrap();
        for topic in ["Revision", "revision - math"] {
            assert!(matches!(
                service.add_card(ALICE, topic, "q", "a").await,
                Err(PortError::InvalidInput(_))
            ));
        }

        let topics = service.list_topics(ALICE).await.unwrap();
        assert_eq!(topics.keys(), vec!["math", "revision", "revision - math"]);
        assert_eq!(topics.get(REVISION_TOPIC).unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_grades_are_all_counted() {
        const GRADES: u32 = 16;
        let store = Arc::new(InMemoryStore::new());
        let service = Arc::new(service(store.clone()));
        let card = service.add_card(ALICE, "math", "q", "a").await.unwrap();
        let token = service.codec().encode(card.id);

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..GRADES {
            let service = service.clone();
            let token = token.clone();
            tasks.spawn(async move { service.grade_card(ALICE, "math", &token, i % 2 == 0, start()).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        let stored = store.get_card(card.id).await.unwrap();
        assert_eq!(stored.times_seen, GRADES);
        assert_eq!(stored.times_correct + stored.times_wrong, stored.times_seen);
        assert_eq!(stored.times_correct, GRADES / 2);
        assert_eq!(stored.ease, 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_draws_never_show_a_card_twice_in_a_pass() {
        const CARDS: usize = 6;
        const DRAWS: usize = 4;
        let store = Arc::new(InMemoryStore::new());
        let service = Arc::new(service(store.clone()));
        for q in 0..CARDS {
            service.add_card(ALICE, "math", &q.to_string(), "a").await.unwrap();
        }

        let mut tasks = tokio::task::JoinSet::new();
        for step in 0..DRAWS {
            let service = service.clone();
            let now = start() + Duration::seconds(step as i64);
            tasks.spawn(async move { service.next_card(ALICE, "math", now).await });
        }
        let mut shown = HashSet::new();
        while let Some(joined) = tasks.join_next().await {
            shown.insert(joined.unwrap().unwrap().card.id);
        }

        assert_eq!(shown.len(), DRAWS.min(CARDS));
        let cards = store.list_cards_by_user(ALICE).await.unwrap();
        assert_eq!(cards.iter().filter(|c| c.seen).count(), DRAWS.min(CARDS));
        assert!(cards.iter().filter(|c| c.seen).all(|c| c.last_seen.is_some()));
    }
}
