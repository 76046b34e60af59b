mod common;

use common::{FlakyStore, StandardData, date, dec, session, test_service};
use devispro::application::{AppError, QuoteEditor};
use devispro::domain::{ItemField, ItemUpdate, LineItem, QuoteStatus, Session};
use rust_decimal::Decimal;

// ========================
// Composing a new quote
// ========================

#[tokio::test]
async fn test_catalog_line_with_updated_quantity() {
    let (service, _temp) = test_service().await.unwrap();
    let session = session();
    StandardData::create(&service, &session).await.unwrap();

    let mut editor = service.new_quote(&session, date("2024-05-10")).await.unwrap();
    let client_id = editor.find_client("Marie Dupont").unwrap().id;
    let reportage = editor.find_service("Reportage").unwrap().id;

    editor.select_client(client_id).unwrap();
    editor.add_catalog_service(reportage).unwrap();
    editor
        .draft_mut()
        .update_item(0, ItemUpdate::Quantity(dec("2")))
        .unwrap();

    let totals = editor.totals();
    assert_eq!(totals.subtotal_before_discount, dec("200"));
    assert_eq!(totals.total_tax, dec("40"));
    assert_eq!(totals.subtotal_excl_tax, dec("200"));
    assert_eq!(totals.total_incl_tax, dec("240"));

    let quote = editor.save().await.unwrap();
    assert_eq!(quote.number, "D-2024-001");
    assert_eq!(quote.status, QuoteStatus::Draft);
    assert_eq!(quote.emission_date, date("2024-05-10"));
    assert_eq!(quote.expiration_date, date("2024-06-09"));
    assert_eq!(quote.client.name, "Marie Dupont");
    assert_eq!(quote.totals, totals);
}

#[tokio::test]
async fn test_mixed_rates_and_discount_persist() {
    let (service, _temp) = test_service().await.unwrap();
    let session = session();
    StandardData::create(&service, &session).await.unwrap();

    let mut editor = service.new_quote(&session, date("2024-05-10")).await.unwrap();
    let client_id = editor.find_client("Studio Lumière").unwrap().id;
    let album = editor.find_service("Album photo").unwrap().id;
    let tirage = editor.find_service("Tirage").unwrap().id;

    editor.select_client(client_id).unwrap();
    editor.add_catalog_service(album).unwrap();
    editor.add_catalog_service(tirage).unwrap();
    editor
        .draft_mut()
        .update_item_from_input(1, ItemField::Quantity, "3")
        .unwrap();
    editor.draft_mut().set_discount(dec("50"));

    let saved = editor.save().await.unwrap();
    let stored = service.get_quote(&session, &saved.number).await.unwrap();

    assert_eq!(stored.totals.subtotal_before_discount, dec("650"));
    assert_eq!(stored.totals.total_tax, dec("15"));
    assert_eq!(stored.totals.subtotal_excl_tax, dec("600"));
    assert_eq!(stored.totals.total_incl_tax, dec("615"));
    assert_eq!(stored.items.len(), 2);
    assert_eq!(stored.items[0].unit, "forfait");
    assert_eq!(stored.items[1].quantity, dec("3"));
    assert_eq!(stored.discount, dec("50"));
}

#[tokio::test]
async fn test_quantity_update_from_input_recomputes() {
    let (service, _temp) = test_service().await.unwrap();
    let session = session();
    StandardData::create(&service, &session).await.unwrap();

    let mut editor = service.new_quote(&session, date("2024-05-10")).await.unwrap();
    let reportage = editor.find_service("Reportage").unwrap().id;
    editor.add_catalog_service(reportage).unwrap();
    assert_eq!(editor.totals().total_incl_tax, dec("120"));

    editor
        .draft_mut()
        .update_item_from_input(0, ItemField::Quantity, "5")
        .unwrap();

    let totals = editor.totals();
    assert_eq!(totals.subtotal_before_discount, dec("500"));
    assert_eq!(totals.total_tax, dec("100"));
    assert_eq!(totals.total_incl_tax, dec("600"));
}

#[tokio::test]
async fn test_manual_lines_and_notes() {
    let (service, _temp) = test_service().await.unwrap();
    let session = session();
    StandardData::create(&service, &session).await.unwrap();

    let mut editor = service.new_quote(&session, date("2024-05-10")).await.unwrap();
    let client_id = editor.find_client("Marie Dupont").unwrap().id;
    editor.select_client(client_id).unwrap();

    editor.draft_mut().add_blank_item();
    editor
        .draft_mut()
        .update_item_from_input(0, ItemField::ServiceName, "Déplacement")
        .unwrap();
    editor
        .draft_mut()
        .update_item_from_input(0, ItemField::UnitPrice, "80,50")
        .unwrap();
    editor.draft_mut().set_event_date(Some(date("2024-07-06")));
    editor.draft_mut().set_notes("Acompte de 30% à la signature");

    let quote = editor.save().await.unwrap();
    let stored = service.get_quote(&session, &quote.number).await.unwrap();

    assert_eq!(stored.items[0].service_name, "Déplacement");
    assert_eq!(stored.items[0].unit, "heure");
    assert_eq!(stored.items[0].unit_price_excl_tax, dec("80.50"));
    assert_eq!(stored.event_date, Some(date("2024-07-06")));
    assert_eq!(stored.notes.as_deref(), Some("Acompte de 30% à la signature"));
    assert_eq!(stored.totals.total_incl_tax, dec("80.50"));
}

#[tokio::test]
async fn test_discount_larger_than_subtotal_is_kept() {
    let (service, _temp) = test_service().await.unwrap();
    let session = session();
    StandardData::create(&service, &session).await.unwrap();

    let mut editor = service.new_quote(&session, date("2024-05-10")).await.unwrap();
    let client_id = editor.find_client("Marie Dupont").unwrap().id;
    editor.select_client(client_id).unwrap();
    editor
        .draft_mut()
        .add_item(LineItem::new("Retouche", dec("1"), "heure", dec("30"), dec("20")));
    editor.draft_mut().set_discount(dec("50"));

    let totals = editor.totals();
    assert!(totals.discount_exceeds_subtotal());
    assert_eq!(totals.subtotal_excl_tax, dec("-20"));
    assert_eq!(totals.total_tax, dec("6"));
    assert_eq!(totals.total_incl_tax, dec("-14"));

    let quote = editor.save().await.unwrap();
    assert_eq!(quote.totals.total_incl_tax, dec("-14"));
}

// ========================
// Save-time validation
// ========================

#[tokio::test]
async fn test_save_requires_client() {
    let (service, _temp) = test_service().await.unwrap();
    let session = session();
    StandardData::create(&service, &session).await.unwrap();

    let mut editor = service.new_quote(&session, date("2024-05-10")).await.unwrap();
    let reportage = editor.find_service("Reportage").unwrap().id;
    editor.add_catalog_service(reportage).unwrap();

    let result = editor.save().await;
    assert!(matches!(result, Err(AppError::MissingClient)));
    assert!(service.list_quotes(&session, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_save_requires_a_line() {
    let (service, _temp) = test_service().await.unwrap();
    let session = session();
    StandardData::create(&service, &session).await.unwrap();

    let mut editor = service.new_quote(&session, date("2024-05-10")).await.unwrap();
    let client_id = editor.find_client("Marie Dupont").unwrap().id;
    editor.select_client(client_id).unwrap();

    let result = editor.save().await;
    assert!(matches!(result, Err(AppError::EmptyQuote)));
    assert!(service.list_quotes(&session, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_client_and_service_are_rejected() {
    let (service, _temp) = test_service().await.unwrap();
    let session = session();
    StandardData::create(&service, &session).await.unwrap();

    let mut editor = service.new_quote(&session, date("2024-05-10")).await.unwrap();

    let result = editor.select_client(uuid::Uuid::new_v4());
    assert!(matches!(result, Err(AppError::ClientNotFound(_))));
    assert_eq!(editor.draft().client_id(), None);

    let result = editor.add_catalog_service(uuid::Uuid::new_v4());
    assert!(matches!(result, Err(AppError::ServiceNotFound(_))));
    assert!(editor.draft().is_empty());
}

#[tokio::test]
async fn test_out_of_range_line_is_an_error() {
    let (service, _temp) = test_service().await.unwrap();
    let session = session();

    let mut editor = service.new_quote(&session, date("2024-05-10")).await.unwrap();
    editor.draft_mut().add_blank_item();

    assert!(editor.draft_mut().remove_item(1).is_err());
    assert!(
        editor
            .draft_mut()
            .update_item(3, ItemUpdate::Unit("jour".into()))
            .is_err()
    );
    assert_eq!(editor.draft().items().len(), 1);
}

// ========================
// Editing saved quotes
// ========================

#[tokio::test]
async fn test_second_save_updates_same_quote() {
    let (service, _temp) = test_service().await.unwrap();
    let session = session();
    StandardData::create(&service, &session).await.unwrap();

    let mut editor = service.new_quote(&session, date("2024-05-10")).await.unwrap();
    let client_id = editor.find_client("Marie Dupont").unwrap().id;
    let reportage = editor.find_service("Reportage").unwrap().id;
    editor.select_client(client_id).unwrap();
    editor.add_catalog_service(reportage).unwrap();

    let first = editor.save().await.unwrap();
    assert!(editor.is_editing());

    editor.draft_mut().set_discount(dec("20"));
    let second = editor.save().await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.number, second.number);
    assert_eq!(second.totals.subtotal_excl_tax, dec("80"));
    assert_eq!(service.list_quotes(&session, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_edit_existing_quote() {
    let (service, _temp) = test_service().await.unwrap();
    let session = session();
    StandardData::create(&service, &session).await.unwrap();

    let number = {
        let mut editor = service.new_quote(&session, date("2024-05-10")).await.unwrap();
        let client_id = editor.find_client("Marie Dupont").unwrap().id;
        editor.select_client(client_id).unwrap();
        for name in ["Reportage", "Album photo", "Tirage"] {
            let id = editor.find_service(name).unwrap().id;
            editor.add_catalog_service(id).unwrap();
        }
        editor.save().await.unwrap().number
    };

    let mut editor = service
        .edit_quote(&session, &number, date("2024-05-20"))
        .await
        .unwrap();
    assert_eq!(editor.draft().items().len(), 3);

    let removed = editor.draft_mut().remove_item(1).unwrap();
    assert_eq!(removed.service_name, "Album photo");
    let other_client = editor.find_client("Studio Lumière").unwrap().id;
    editor.select_client(other_client).unwrap();

    let updated = editor.save().await.unwrap();
    assert_eq!(updated.number, number);
    // Emission date is not moved by later edits
    assert_eq!(updated.emission_date, date("2024-05-10"));
    assert_eq!(updated.client.name, "Studio Lumière");
    assert_eq!(updated.totals.subtotal_before_discount, dec("150"));
    assert_eq!(updated.totals.total_tax, dec("25"));
}

#[tokio::test]
async fn test_quote_numbers_increase_per_owner() {
    let (service, _temp) = test_service().await.unwrap();
    let session = session();
    let other = Session::new("atelier");
    StandardData::create(&service, &session).await.unwrap();
    StandardData::create(&service, &other).await.unwrap();

    let mut numbers = Vec::new();
    for owner in [&session, &session, &other] {
        let mut editor = service.new_quote(owner, date("2024-05-10")).await.unwrap();
        let client_id = editor.find_client("Marie Dupont").unwrap().id;
        let reportage = editor.find_service("Reportage").unwrap().id;
        editor.select_client(client_id).unwrap();
        editor.add_catalog_service(reportage).unwrap();
        numbers.push(editor.save().await.unwrap().number);
    }

    assert_eq!(numbers, vec!["D-2024-001", "D-2024-002", "D-2024-001"]);
    assert_eq!(service.list_quotes(&session, None).await.unwrap().len(), 2);
    assert_eq!(service.list_quotes(&other, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_preview_reflects_draft() {
    let (service, _temp) = test_service().await.unwrap();
    let session = session();
    StandardData::create(&service, &session).await.unwrap();

    let mut editor = service.new_quote(&session, date("2024-05-10")).await.unwrap();
    let client_id = editor.find_client("Marie Dupont").unwrap().id;
    let reportage = editor.find_service("Reportage").unwrap().id;
    editor.select_client(client_id).unwrap();
    editor.add_catalog_service(reportage).unwrap();

    let text = editor.preview().to_string();
    assert!(text.contains("DEVIS (brouillon)"));
    assert!(text.contains("Marie Dupont"));
    assert!(text.contains("120.00 €"));

    let quote = editor.save().await.unwrap();
    let preview = editor.preview();
    assert_eq!(preview.number, Some(quote.number.as_str()));
    assert!(preview.to_string().contains("DEVIS D-2024-001"));
}

// ========================
// Persistence failures
// ========================

#[tokio::test]
async fn test_failed_save_keeps_draft() {
    let store = FlakyStore::new(1);
    let client_id = store.client().id;
    let service_id = store.service().id;

    let mut editor = QuoteEditor::open_new(&store, Session::default(), date("2024-05-10"))
        .await
        .unwrap();
    editor.select_client(client_id).unwrap();
    editor.add_catalog_service(service_id).unwrap();
    editor.draft_mut().set_discount(dec("10"));
    let before = editor.draft().clone();

    let result = editor.save().await;
    assert!(matches!(result, Err(AppError::PersistenceFailure(_))));
    assert_eq!(editor.draft(), &before);
    assert!(!editor.is_editing());
    assert!(store.saved_quotes().is_empty());

    // Retry with the same draft
    let quote = editor.save().await.unwrap();
    assert_eq!(quote.totals.total_incl_tax, dec("110"));
    assert_eq!(store.saved_quotes().len(), 1);
}

#[tokio::test]
async fn test_failed_update_keeps_previous_version() {
    let store = FlakyStore::new(0);
    let client_id = store.client().id;
    let service_id = store.service().id;

    let mut editor = QuoteEditor::open_new(&store, Session::default(), date("2024-05-10"))
        .await
        .unwrap();
    editor.select_client(client_id).unwrap();
    editor.add_catalog_service(service_id).unwrap();
    let saved = editor.save().await.unwrap();

    let mut editor = QuoteEditor::open_existing(&store, Session::default(), saved.id, date("2024-05-11"))
        .await
        .unwrap();
    editor.draft_mut().remove_item(0).unwrap();
    editor.draft_mut().add_item(LineItem::new("Tirage", dec("4"), "unité", dec("5"), Decimal::ZERO));

    store.fail_next_saves(1);
    let result = editor.save().await;
    assert!(matches!(result, Err(AppError::PersistenceFailure(_))));
    assert_eq!(editor.draft().items()[0].service_name, "Tirage");
    assert_eq!(store.saved_quotes()[0].totals.total_incl_tax, dec("120"));

    let updated = editor.save().await.unwrap();
    assert_eq!(updated.id, saved.id);
    assert_eq!(updated.totals.total_incl_tax, dec("20"));
    assert_eq!(store.saved_quotes().len(), 1);
}

#[tokio::test]
async fn test_open_unknown_quote() {
    let store = FlakyStore::new(0);
    let result =
        QuoteEditor::open_existing(&store, Session::default(), uuid::Uuid::new_v4(), date("2024-05-10")).await;
    assert!(matches!(result, Err(AppError::QuoteNotFound(_))));
}
