use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tuplemap_core::{
    tuple, BatchReader, EngineError, Field, Header, LoadReader, MappedRelation, MappingError,
    MappingResult, MemoryRelation, Object, ObjectMapper, ObjectStream, Reader, RelationAlgebra,
    RelationError, SortKey, Tuple, TupleMapper, Value,
};

type Users = MappedRelation<MemoryRelation, ObjectMapper>;

fn mapped(model: &str, names: &[&str], tuples: Vec<Tuple>) -> Users {
    let header = Header::scalars(names.iter().copied()).unwrap();
    let mapper = ObjectMapper::new(model, &header);
    MappedRelation::new(MemoryRelation::new(header, tuples).unwrap(), mapper)
}

fn users() -> Users {
    mapped(
        "user",
        &["id", "name"],
        vec![tuple![1, "John"], tuple![2, "Jane"]],
    )
}

fn user(id: i64, name: &str) -> Object {
    Object::new("user").with("id", id).with("name", name)
}

fn sorted_rows(relation: &Users) -> Vec<Tuple> {
    let mut rows = relation.relation().tuples().collect::<Vec<_>>();
    rows.sort();
    rows
}

#[test]
fn insert_adds_the_dumped_tuple() {
    let inserted = users().insert(&user(3, "Piotr")).unwrap();
    assert_eq!(
        sorted_rows(&inserted),
        vec![tuple![1, "John"], tuple![2, "Jane"], tuple![3, "Piotr"]]
    );
}

#[test]
fn delete_removes_the_dumped_tuple() {
    let deleted = users().delete(&user(1, "John")).unwrap();
    assert_eq!(sorted_rows(&deleted), vec![tuple![2, "Jane"]]);
}

#[test]
fn update_swaps_original_for_new_object() {
    let updated = users()
        .update(&user(2, "Jane Doe"), &user(2, "Jane"))
        .unwrap();
    assert_eq!(
        sorted_rows(&updated),
        vec![tuple![1, "John"], tuple![2, "Jane Doe"]]
    );
}

#[test]
fn update_with_missing_original_only_inserts() {
    let updated = users()
        .update(&user(3, "Piotr"), &user(9, "Nobody"))
        .unwrap();
    assert_eq!(sorted_rows(&updated).len(), 3);
}

#[test]
fn replace_swaps_the_whole_tuple_set() {
    let replaced = users()
        .replace(&[user(5, "Ann"), user(4, "Bob")])
        .unwrap();
    assert_eq!(
        sorted_rows(&replaced),
        vec![tuple![4, "Bob"], tuple![5, "Ann"]]
    );
}

#[test]
fn transforms_leave_the_source_wrapper_unchanged() {
    let original = users();
    let before = original.to_vec().unwrap();

    original.insert(&user(3, "Piotr")).unwrap();
    original.delete(&user(1, "John")).unwrap();
    original.replace(&[]).unwrap();
    original.project(&["id"]).unwrap();
    original.rename(&[("name", "full_name")]).unwrap();
    original.first(1).unwrap();
    original.inject_reader(BatchReader::new(1));

    assert_eq!(original.to_vec().unwrap(), before);
    assert_eq!(original.mapper().header(), Header::scalars(["id", "name"]).unwrap());
}

#[test]
fn one_fails_on_empty_relation_without_fallback() {
    let empty = users().replace(&[]).unwrap();
    let err = empty.one().unwrap_err();
    assert!(matches!(err, RelationError::NoTuples));
}

#[test]
fn one_returns_fallback_on_empty_relation() {
    let empty = users().replace(&[]).unwrap();
    let fallback = empty.one_or_else(|| user(0, "Guest")).unwrap();
    assert_eq!(fallback, user(0, "Guest"));
}

#[test]
fn one_returns_the_single_object() {
    let single = mapped("user", &["id", "name"], vec![tuple![1, "John"]]);
    assert_eq!(single.one().unwrap(), user(1, "John"));
}

#[test]
fn one_fails_when_many_tuples_match() {
    let err = users().one().unwrap_err();
    assert!(matches!(err, RelationError::ManyTuples));
    assert!(matches!(
        users().one_or_else(|| user(0, "Guest")).unwrap_err(),
        RelationError::ManyTuples
    ));
}

#[test]
fn positional_operations_sort_by_the_full_header_first() {
    for storage in [vec![tuple![2], tuple![1]], vec![tuple![1], tuple![2]]] {
        let ids = mapped("row", &["id"], storage);

        let first = ids.first(1).unwrap().relation().tuples().collect::<Vec<_>>();
        let last = ids.last(1).unwrap().relation().tuples().collect::<Vec<_>>();
        let take = ids.take(1).unwrap().relation().tuples().collect::<Vec<_>>();
        let dropped = ids.drop(1).unwrap().relation().tuples().collect::<Vec<_>>();

        assert_eq!(first, vec![tuple![1]]);
        assert_eq!(last, vec![tuple![2]]);
        assert_eq!(take, vec![tuple![1]]);
        assert_eq!(dropped, vec![tuple![2]]);
    }
}

#[test]
fn take_with_ties_in_the_first_attribute_stays_deterministic() {
    let relation = mapped(
        "user",
        &["id", "name"],
        vec![tuple![1, "b"], tuple![1, "a"], tuple![0, "z"]],
    );
    let taken = relation.take(2).unwrap().to_vec().unwrap();
    assert_eq!(taken, vec![user(0, "z"), user(1, "a")]);
}

#[test]
fn raw_engine_refuses_positional_access_without_order() {
    let err = users().relation().take(1).unwrap_err();
    assert!(matches!(err, EngineError::Unordered { operation: "take" }));
}

#[test]
fn sort_by_orders_objects() {
    let sorted = users().sort_by(&[SortKey::desc("id")]).unwrap();
    let names = sorted
        .to_vec()
        .unwrap()
        .iter()
        .map(|object| object.value("name").cloned())
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![Some(Value::from("Jane")), Some(Value::from("John"))]
    );
}

#[test]
fn restrict_narrows_rows_and_keeps_the_mapper() {
    let relation = users();
    let restricted = relation
        .restrict(|tuple| tuple.get("name") == Some(&Value::from("Jane")))
        .unwrap();
    assert_eq!(restricted.mapper(), relation.mapper());
    assert_eq!(restricted.one().unwrap(), user(2, "Jane"));
}

#[test]
fn project_narrows_relation_and_mapper_together() {
    let projected = users().project(&["id"]).unwrap();
    assert_eq!(projected.mapper().header(), Header::scalars(["id"]).unwrap());
    assert_eq!(projected.header(), &Header::scalars(["id"]).unwrap());
    for object in projected.to_vec().unwrap() {
        assert_eq!(object.field_names(), ["id"]);
    }
}

#[test]
fn rename_applies_to_relation_and_mapper() {
    let renamed = users().rename(&[("name", "full_name")]).unwrap();
    let john = renamed
        .restrict(|tuple| tuple.get("id") == Some(&Value::from(1)))
        .unwrap()
        .one()
        .unwrap();
    assert_eq!(john.value("full_name"), Some(&Value::from("John")));
    assert_eq!(renamed.mapper().header(), renamed.header().clone());
}

#[test]
fn join_then_group_loads_nested_collections() {
    let tasks = mapped(
        "task",
        &["user_id", "title"],
        vec![tuple![1, "ship"], tuple![1, "test"], tuple![2, "plan"]],
    )
    .rename(&[("user_id", "id")])
    .unwrap();

    let with_tasks = users()
        .join(&tasks)
        .unwrap()
        .group(&[("tasks", &tasks.project(&["title"]).unwrap())])
        .unwrap();
    assert_eq!(with_tasks.mapper().header(), with_tasks.header().clone());

    let john = with_tasks
        .restrict(|tuple| tuple.get("id") == Some(&Value::from(1)))
        .unwrap()
        .one()
        .unwrap();
    let Some(Field::Objects(john_tasks)) = john.get("tasks") else {
        panic!("tasks should be grouped");
    };
    let titles = john_tasks
        .iter()
        .map(|task| task.value("title").cloned())
        .collect::<Vec<_>>();
    assert_eq!(
        titles,
        vec![Some(Value::from("ship")), Some(Value::from("test"))]
    );
    assert_eq!(john_tasks[0].model(), "task");
}

#[test]
fn join_then_wrap_loads_nested_objects() {
    let addresses = mapped(
        "address",
        &["id", "city"],
        vec![tuple![1, "Krakow"], tuple![2, "Lisbon"]],
    );

    let with_address = users()
        .join(&addresses)
        .unwrap()
        .wrap(&[("address", &addresses.project(&["city"]).unwrap())])
        .unwrap();

    let jane = with_address
        .restrict(|tuple| tuple.get("id") == Some(&Value::from(2)))
        .unwrap()
        .one()
        .unwrap();
    let Some(Field::Object(address)) = jane.get("address") else {
        panic!("address should be wrapped");
    };
    assert_eq!(address.value("city"), Some(&Value::from("Lisbon")));

    let moved = jane
        .clone()
        .with_field(
            "address",
            Field::Object(Object::new("address").with("city", "Porto")),
        );
    let updated = with_address.update(&moved, &jane).unwrap();
    assert_eq!(
        updated
            .restrict(|tuple| tuple.get("id") == Some(&Value::from(2)))
            .unwrap()
            .one()
            .unwrap(),
        moved
    );
}

#[test]
fn join_surfaces_engine_errors_unchanged() {
    let nested = mapped("row", &["id", "city"], vec![tuple![1, "Krakow"]])
        .wrap(&[("name", &mapped("row", &["city"], vec![]))])
        .unwrap();
    let err = users().join(&nested).unwrap_err();
    assert!(matches!(
        err,
        RelationError::Engine(EngineError::IncompatibleHeader(name)) if name == "name"
    ));
}

#[test]
fn wrappers_with_equal_mappers_are_equal_regardless_of_tuples() {
    let other_tuples = mapped("user", &["id", "name"], vec![tuple![9, "Zed"]]);
    assert_eq!(users(), other_tuples);

    let other_model = mapped("account", &["id", "name"], vec![tuple![1, "John"]]);
    assert_ne!(users(), other_model);
    assert_ne!(users(), users().project(&["id"]).unwrap());
}

#[derive(Clone)]
struct CountingReader {
    passes: Arc<AtomicUsize>,
}

impl Reader<ObjectMapper> for CountingReader {
    fn read<'a>(
        &self,
        tuples: Box<dyn Iterator<Item = Tuple> + 'a>,
        mapper: &'a ObjectMapper,
    ) -> ObjectStream<'a, Object>
    where
        ObjectMapper: 'a,
    {
        self.passes.fetch_add(1, Ordering::SeqCst);
        LoadReader.read(tuples, mapper)
    }
}

#[test]
fn injected_reader_drives_every_iteration_mode() {
    let passes = Arc::new(AtomicUsize::new(0));
    let plain = users();
    let counted = plain.inject_reader(CountingReader {
        passes: Arc::clone(&passes),
    });

    assert_eq!(counted.to_vec().unwrap(), plain.to_vec().unwrap());
    assert_eq!(passes.load(Ordering::SeqCst), 1);

    let mut seen = 0;
    for object in &counted {
        object.unwrap();
        seen += 1;
    }
    assert_eq!(seen, 2);
    assert_eq!(passes.load(Ordering::SeqCst), 2);

    assert_eq!(counted.iter().into_iter().count(), 2);
    assert_eq!(passes.load(Ordering::SeqCst), 3);

    let inserted = counted.insert(&user(3, "Piotr")).unwrap();
    assert_eq!(
        sorted_rows(&inserted),
        sorted_rows(&plain.insert(&user(3, "Piotr")).unwrap())
    );
    assert_eq!(passes.load(Ordering::SeqCst), 3);

    // Derived wrappers keep the injected reader.
    inserted.project(&["id"]).unwrap().to_vec().unwrap();
    assert_eq!(passes.load(Ordering::SeqCst), 4);
}

#[test]
fn lazy_iteration_with_batch_reader_surfaces_load_errors() {
    let ids = mapped("row", &["id"], vec![tuple![1], tuple![2]]);
    let narrowed = MappedRelation::new(
        ids.relation().clone(),
        ObjectMapper::new("row", &Header::scalars(["id", "name"]).unwrap()),
    )
    .inject_reader(BatchReader::new(2));

    let results = narrowed.iter().into_iter().collect::<Vec<_>>();
    assert_eq!(results.len(), 1);
    assert!(matches!(
        results[0],
        Err(MappingError::ArityMismatch {
            expected: 2,
            actual: 1
        })
    ));
}

#[test]
fn batch_reader_yields_the_same_objects() {
    let relation = mapped(
        "row",
        &["id"],
        (0..10).map(|id| tuple![id]).collect(),
    );
    assert_eq!(
        relation.inject_reader(BatchReader::new(3)).to_vec().unwrap(),
        relation.to_vec().unwrap()
    );
}

#[test]
fn lazy_iteration_matches_eager_materialization() {
    let relation = users();
    let lazy = relation
        .iter()
        .into_iter()
        .collect::<MappingResult<Vec<_>>>()
        .unwrap();
    assert_eq!(lazy, relation.to_vec().unwrap());

    let mut eager = Vec::new();
    relation
        .each(|object| eager.push(object))
        .unwrap()
        .each(|_| {})
        .unwrap();
    assert_eq!(eager, lazy);

    let mut by_ref = 0;
    for object in &relation {
        object.unwrap();
        by_ref += 1;
    }
    assert_eq!(by_ref, 2);
}

#[test]
fn loaded_objects_deserialize_into_typed_models() {
    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct User {
        id: i64,
        name: String,
    }

    let users = users()
        .sort()
        .unwrap()
        .to_vec()
        .unwrap()
        .iter()
        .map(|object| object.deserialize_into::<User>().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(
        users,
        vec![
            User {
                id: 1,
                name: "John".to_string()
            },
            User {
                id: 2,
                name: "Jane".to_string()
            },
        ]
    );
}
