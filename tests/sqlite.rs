//! End to end tests against an in-memory SQLite database.

use generic_aggregation::{
    generic_aggregate, generic_annotate, generic_annotate_ordered, generic_filter,
    AggregateValue, Aggregation, Condition, Database, DatabaseConfiguration, DatabaseDriver,
    DbType, Entity, EntityType, Ordering, RowSet, TagRegistry, Value,
};

/// Everything after this stamp counts as recent.
const CUTOFF: &str = "2026-01-01 00:00:00";

struct Fixture {
    db: Database,
    tags: TagRegistry,
    food: Entity,
    rating: Entity,
    char_gfk: Entity,
}

fn food_entity() -> Entity {
    EntityType::new("food", "food")
        .add_column("name", DbType::VarChar)
        .add_relation("ratings", "rating")
        .add_relation("char_gfk", "char_gfk")
        .build()
}

fn rating_entity() -> Entity {
    EntityType::new("rating", "rating")
        .add_column("rating", DbType::Int32)
        .add_column("created", DbType::DateTime)
        .add_column("content_type_id", DbType::Int64)
        .add_column("object_id", DbType::Int32)
        .add_generic_reference("content_object", "content_type_id", "object_id")
        .build()
}

fn char_gfk_entity() -> Entity {
    EntityType::new("char_gfk", "char_gfk")
        .add_column("name", DbType::VarChar)
        .add_column("content_type_id", DbType::Int64)
        .add_column("object_id", DbType::Text)
        .add_generic_reference("content_object", "content_type_id", "object_id")
        .build()
}

async fn exec(db: &Database, statement: &str, params: &[Value]) {
    db.raw_sql(statement, Some(params), None).await.unwrap();
}

async fn insert_rating(db: &Database, tag: i64, food_id: i64, rating: i64, created: &str) {
    exec(
        db,
        "INSERT INTO rating (rating, created, content_type_id, object_id) VALUES (?, ?, ?, ?)",
        &[
            Value::I64(rating),
            Value::String(created.to_string()),
            Value::I64(tag),
            Value::I64(food_id),
        ],
    )
    .await;
}

/**
Seed the scenario every test runs against.

Foods: apple (id 1), orange (id 2), peach (id 3). Ratings per food:
apple 5, 3 recent plus 1, 3 older; orange 4, 3 recent plus 8 older;
peach none. The text keyed table points twice at apple and once at
orange.
*/
async fn setup() -> Fixture {
    // One pooled connection, otherwise every connection would get its
    // own private in-memory database.
    let mut configuration = DatabaseConfiguration::new(DatabaseDriver::SQLite {
        filename: String::from(":memory:"),
    });
    configuration.max_connections = 1;
    let db = Database::connect(configuration).await.unwrap();

    exec(
        &db,
        "CREATE TABLE food (id INTEGER PRIMARY KEY AUTOINCREMENT, name VARCHAR(255) NOT NULL)",
        &[],
    )
    .await;
    exec(
        &db,
        "CREATE TABLE rating (id INTEGER PRIMARY KEY AUTOINCREMENT, rating INTEGER NOT NULL, \
         created datetime NOT NULL, content_type_id BIGINT NOT NULL, object_id INTEGER NOT NULL)",
        &[],
    )
    .await;
    exec(
        &db,
        "CREATE TABLE char_gfk (id INTEGER PRIMARY KEY AUTOINCREMENT, name VARCHAR(255) NOT NULL, \
         content_type_id BIGINT NOT NULL, object_id TEXT NOT NULL)",
        &[],
    )
    .await;

    let tags = TagRegistry::new();
    tags.create_table(&db).await.unwrap();

    let food = food_entity();
    let rating = rating_entity();
    let char_gfk = char_gfk_entity();

    for name in ["apple", "orange", "peach"] {
        exec(
            &db,
            "INSERT INTO food (name) VALUES (?)",
            &[Value::String(name.to_string())],
        )
        .await;
    }

    let food_tag = tags.tag_for(&db, &food).await.unwrap();

    insert_rating(&db, food_tag, 1, 5, "2026-02-01 10:00:00").await;
    insert_rating(&db, food_tag, 1, 3, "2026-03-05 18:30:00").await;
    insert_rating(&db, food_tag, 1, 1, "2025-06-01 09:00:00").await;
    insert_rating(&db, food_tag, 1, 3, "2025-11-20 12:00:00").await;
    insert_rating(&db, food_tag, 2, 4, "2026-01-15 08:00:00").await;
    insert_rating(&db, food_tag, 2, 3, "2026-04-02 11:45:00").await;
    insert_rating(&db, food_tag, 2, 8, "2025-03-10 16:20:00").await;

    for (name, food_id) in [("a1", "1"), ("a2", "1"), ("o1", "2")] {
        exec(
            &db,
            "INSERT INTO char_gfk (name, content_type_id, object_id) VALUES (?, ?, ?)",
            &[
                Value::String(name.to_string()),
                Value::I64(food_tag),
                Value::String(food_id.to_string()),
            ],
        )
        .await;
    }

    Fixture {
        db,
        tags,
        food,
        rating,
        char_gfk,
    }
}

#[tokio::test]
async fn annotate_counts_through_the_declared_relation() {
    let f = setup().await;

    let rows = generic_annotate(
        &f.db,
        &f.tags,
        &f.food,
        &f.rating,
        &Aggregation::count("rating").via("ratings"),
        None,
        None,
    )
    .await
    .unwrap()
    .order_by("name", Ordering::Asc);

    let fetched = rows.fetch_all(&f.db).await.unwrap();
    assert_eq!(fetched.len(), 3);

    let scores: Vec<(String, i64)> = fetched
        .iter()
        .map(|row| (row.get("name").unwrap(), row.get("score").unwrap()))
        .collect();
    assert_eq!(
        scores,
        vec![
            ("apple".to_string(), 4),
            ("orange".to_string(), 3),
            ("peach".to_string(), 0),
        ]
    );
}

#[tokio::test]
async fn annotate_averages_through_a_correlated_subquery() {
    let f = setup().await;

    // No relation named, so the correlated strategy must carry this.
    let rows = generic_annotate(
        &f.db,
        &f.tags,
        &f.food,
        &f.rating,
        &Aggregation::avg("rating"),
        None,
        None,
    )
    .await
    .unwrap()
    .order_by("name", Ordering::Asc);

    let fetched = rows.fetch_all(&f.db).await.unwrap();
    let averages: Vec<Option<f64>> = fetched
        .iter()
        .map(|row| row.get("score").unwrap())
        .collect();
    assert_eq!(averages, vec![Some(3.0), Some(5.0), None]);
}

#[tokio::test]
async fn annotate_respects_a_filtered_linked_set() {
    let f = setup().await;

    let recent =
        RowSet::all(&f.rating).filter(Condition::greater_or_equals("created", CUTOFF));
    let rows = generic_annotate(
        &f.db,
        &f.tags,
        &f.food,
        recent,
        &Aggregation::count("rating").via("ratings"),
        None,
        None,
    )
    .await
    .unwrap()
    .order_by("name", Ordering::Asc);

    let counts: Vec<i64> = rows
        .fetch_all(&f.db)
        .await
        .unwrap()
        .iter()
        .map(|row| row.get("score").unwrap())
        .collect();
    assert_eq!(counts, vec![2, 2, 0]);
}

#[tokio::test]
async fn annotate_exposes_a_custom_alias() {
    let f = setup().await;

    let rows = generic_annotate(
        &f.db,
        &f.tags,
        &f.food,
        &f.rating,
        &Aggregation::count("rating").via("ratings"),
        None,
        Some("count"),
    )
    .await
    .unwrap();
    assert_eq!(rows.annotation_alias(), Some("count"));

    let rows = rows.order_by("name", Ordering::Asc);
    let fetched = rows.fetch_all(&f.db).await.unwrap();
    assert_eq!(fetched[0].get::<i64, _>("count").unwrap(), 4);
}

#[tokio::test]
async fn annotate_casts_text_reference_ids() {
    let f = setup().await;

    // The relation is declared but the id column is text, so the cast
    // requirement forces the correlated strategy.
    let rows = generic_annotate(
        &f.db,
        &f.tags,
        &f.food,
        &f.char_gfk,
        &Aggregation::count("id").via("char_gfk"),
        None,
        None,
    )
    .await
    .unwrap()
    .order_by("name", Ordering::Asc);

    let counts: Vec<i64> = rows
        .fetch_all(&f.db)
        .await
        .unwrap()
        .iter()
        .map(|row| row.get("score").unwrap())
        .collect();
    assert_eq!(counts, vec![2, 1, 0]);
}

#[tokio::test]
async fn ordered_annotation_sorts_by_the_aggregate() {
    let f = setup().await;

    let rows = generic_annotate_ordered(
        &f.db,
        &f.tags,
        &f.food,
        &f.rating,
        &Aggregation::count("rating").via("ratings"),
        None,
        None,
        false,
    )
    .await
    .unwrap();

    let names: Vec<String> = rows
        .fetch_all(&f.db)
        .await
        .unwrap()
        .iter()
        .map(|row| row.get("name").unwrap())
        .collect();
    assert_eq!(names, vec!["apple", "orange", "peach"]);
}

#[tokio::test]
async fn aggregate_computes_scalars() {
    let f = setup().await;

    let count = generic_aggregate(
        &f.db,
        &f.tags,
        &f.food,
        &f.rating,
        &Aggregation::count("rating").via("ratings"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(count, AggregateValue::Integer(7));

    let sum = generic_aggregate(
        &f.db,
        &f.tags,
        &f.food,
        &f.rating,
        &Aggregation::sum("rating"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(sum, AggregateValue::Integer(27));

    let apples = RowSet::all(&f.food).filter(Condition::equals("name", "apple"));
    let average = generic_aggregate(
        &f.db,
        &f.tags,
        apples,
        &f.rating,
        &Aggregation::avg("rating"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(average, AggregateValue::Float(3.0));
}

#[tokio::test]
async fn aggregate_over_a_filtered_linked_set() {
    let f = setup().await;

    let recent =
        RowSet::all(&f.rating).filter(Condition::greater_or_equals("created", CUTOFF));
    let sum = generic_aggregate(
        &f.db,
        &f.tags,
        &f.food,
        recent.clone(),
        &Aggregation::sum("rating").via("ratings"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(sum, AggregateValue::Integer(15));

    // Without the relation both strategies must agree.
    let count = generic_aggregate(
        &f.db,
        &f.tags,
        &f.food,
        recent,
        &Aggregation::count("rating"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(count, AggregateValue::Integer(4));
}

#[tokio::test]
async fn aggregate_over_an_empty_group() {
    let f = setup().await;

    let peaches = RowSet::all(&f.food).filter(Condition::equals("name", "peach"));
    let sum = generic_aggregate(
        &f.db,
        &f.tags,
        peaches.clone(),
        &f.rating,
        &Aggregation::sum("rating").via("ratings"),
        None,
    )
    .await
    .unwrap();
    assert!(sum.is_null());

    let count = generic_aggregate(
        &f.db,
        &f.tags,
        peaches,
        &f.rating,
        &Aggregation::count("rating"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(count, AggregateValue::Integer(0));
}

#[tokio::test]
async fn filter_keeps_only_the_pointing_rows() {
    let f = setup().await;

    let apples = RowSet::all(&f.food).filter(Condition::equals("name", "apple"));
    let apple_ratings = generic_filter(&f.db, &f.tags, &f.rating, apples.clone(), None)
        .await
        .unwrap();
    assert_eq!(apple_ratings.count(&f.db).await.unwrap(), 4);

    // Applying the same restriction again narrows nothing further.
    let narrowed = generic_filter(&f.db, &f.tags, apple_ratings, apples, None)
        .await
        .unwrap();
    assert_eq!(narrowed.count(&f.db).await.unwrap(), 4);
}

#[tokio::test]
async fn filter_casts_text_reference_ids() {
    let f = setup().await;

    let apples = RowSet::all(&f.food).filter(Condition::equals("name", "apple"));
    let rows = generic_filter(&f.db, &f.tags, &f.char_gfk, apples, None)
        .await
        .unwrap()
        .fetch_all(&f.db)
        .await
        .unwrap();

    let names: Vec<String> = rows.iter().map(|row| row.get("name").unwrap()).collect();
    assert_eq!(names, vec!["a1", "a2"]);
}

#[tokio::test]
async fn strategies_compute_the_same_aggregate() {
    let f = setup().await;

    let joined = generic_aggregate(
        &f.db,
        &f.tags,
        &f.food,
        &f.rating,
        &Aggregation::sum("rating").via("ratings"),
        None,
    )
    .await
    .unwrap();
    let correlated = generic_aggregate(
        &f.db,
        &f.tags,
        &f.food,
        &f.rating,
        &Aggregation::sum("rating"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(joined, correlated);
    assert_eq!(joined, AggregateValue::Integer(27));

    // Same shape with a filtered linked set.
    let recent = RowSet::all(&f.rating).filter(Condition::greater_or_equals("created", CUTOFF));
    let joined = generic_aggregate(
        &f.db,
        &f.tags,
        &f.food,
        recent.clone(),
        &Aggregation::count("rating").via("ratings"),
        None,
    )
    .await
    .unwrap();
    let correlated = generic_aggregate(
        &f.db,
        &f.tags,
        &f.food,
        recent,
        &Aggregation::count("rating"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(joined, correlated);
}

#[tokio::test]
async fn transactions_commit_and_roll_back() {
    let f = setup().await;

    let mut tx = f.db.start_transaction().await.unwrap();
    f.db.raw_sql(
        "INSERT INTO food (name) VALUES (?)",
        Some(&[Value::String("durian".to_string())]),
        Some(&mut tx),
    )
    .await
    .unwrap();
    tx.rollback().await.unwrap();
    assert_eq!(RowSet::all(&f.food).count(&f.db).await.unwrap(), 3);

    let mut tx = f.db.start_transaction().await.unwrap();
    f.db.raw_sql(
        "INSERT INTO food (name) VALUES (?)",
        Some(&[Value::String("durian".to_string())]),
        Some(&mut tx),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(RowSet::all(&f.food).count(&f.db).await.unwrap(), 4);
}

#[tokio::test]
async fn tags_are_stable_and_distinct() {
    let f = setup().await;

    let food_tag = f.tags.tag_for(&f.db, &f.food).await.unwrap();
    let gfk_tag = f.tags.tag_for(&f.db, &f.char_gfk).await.unwrap();
    assert_ne!(food_tag, gfk_tag);

    assert_eq!(f.tags.tag_for(&f.db, &f.food).await.unwrap(), food_tag);

    // A fresh registry resolves the same persisted tag.
    let fresh = TagRegistry::new();
    assert_eq!(fresh.tag_for(&f.db, &f.food).await.unwrap(), food_tag);
}

#[tokio::test]
async fn annotated_sets_stay_lazy() {
    let f = setup().await;

    let rows = generic_annotate(
        &f.db,
        &f.tags,
        &f.food,
        &f.rating,
        &Aggregation::count("rating").via("ratings"),
        None,
        None,
    )
    .await
    .unwrap()
    .order_by("name", Ordering::Asc);

    assert_eq!(rows.fetch_all(&f.db).await.unwrap().len(), 3);

    let food_tag = f.tags.tag_for(&f.db, &f.food).await.unwrap();
    exec(
        &f.db,
        "INSERT INTO food (name) VALUES (?)",
        &[Value::String("persimmon".to_string())],
    )
    .await;
    insert_rating(&f.db, food_tag, 3, 2, "2026-05-01 12:00:00").await;

    // The held set reflects the store at fetch time.
    let fetched = rows.fetch_all(&f.db).await.unwrap();
    assert_eq!(fetched.len(), 4);
    let scores: Vec<(String, i64)> = fetched
        .iter()
        .map(|row| (row.get("name").unwrap(), row.get("score").unwrap()))
        .collect();
    assert_eq!(
        scores,
        vec![
            ("apple".to_string(), 4),
            ("orange".to_string(), 3),
            ("peach".to_string(), 1),
            ("persimmon".to_string(), 0),
        ]
    );
}
