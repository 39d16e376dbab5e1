use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use cookbook::{Category, NewRecipe, Recipe, RecipeId};
use reqwest::{
    Client, StatusCode,
    header::{COOKIE, LOCATION, SET_COOKIE},
    multipart::{Form, Part},
    redirect::Policy,
};
use serde_json::Value;
use server::{
    config::Config,
    error::StoreError,
    router,
    routes::{SUBMIT_FAILED_MESSAGE, SUBMITTED_MESSAGE},
    search::TextQuery,
    state::AppState,
    store::{CategoryStore, MemoryStore, RecipeStore},
};
use tempfile::TempDir;
use tokio::net::TcpListener;

struct TestServer {
    base: String,
    client: Client,
    uploads: PathBuf,
    _dir: TempDir,
}

impl TestServer {
    async fn start(categories: Arc<dyn CategoryStore>, recipes: Arc<dyn RecipeStore>) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let uploads = dir.path().join("public").join("uploads");

        let state = AppState::with_stores(Config::in_memory(&uploads), categories, recipes);

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(state)))
                .await
                .expect("serve");
        });

        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .expect("client");

        Self {
            base: format!("http://{addr}"),
            client,
            uploads,
            _dir: dir,
        }
    }

    async fn memory(store: Arc<MemoryStore>) -> Self {
        Self::start(store.clone(), store).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.get(self.url(path)).send().await.expect("send");
        let status = response.status();

        (status, response.json().await.expect("json body"))
    }

    async fn submit(&self, form: Form) -> reqwest::Response {
        self.client
            .post(self.url("/submit-recipe"))
            .multipart(form)
            .send()
            .await
            .expect("send")
    }

    /// Follows a submission redirect, replaying its flash cookie.
    async fn follow(&self, response: &reqwest::Response) -> (Value, String) {
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .expect("flash cookie")
            .to_str()
            .expect("ascii cookie")
            .split(';')
            .next()
            .expect("cookie pair")
            .to_string();

        let page = self
            .client
            .get(self.url("/submit-recipe"))
            .header(COOKIE, cookie)
            .send()
            .await
            .expect("send");

        let cleared = page
            .headers()
            .get(SET_COOKIE)
            .expect("clearing cookie")
            .to_str()
            .expect("ascii cookie")
            .to_string();

        (page.json().await.expect("json body"), cleared)
    }
}

fn new_recipe(name: &str, category: &str) -> NewRecipe {
    NewRecipe {
        name: name.to_string(),
        description: format!("How to make {name}."),
        email: "cook@example.com".to_string(),
        ingredients: vec!["olive oil".to_string()],
        category: category.to_string(),
        image: None,
    }
}

fn category(name: &str) -> Category {
    Category {
        name: name.to_string(),
        image: format!("{}-food.jpg", name.to_lowercase()),
    }
}

fn complete_form() -> Form {
    Form::new()
        .text("name", "Crab Cakes")
        .text("description", "Combine, chill, shape and fry.")
        .text("email", "cook@example.com")
        .text("ingredients", "750 g cooked crabmeat")
        .text("ingredients", "300 g mashed potatoes")
        .text("category", "American")
}

fn ids(recipes: &Value) -> Vec<u64> {
    recipes
        .as_array()
        .expect("recipe list")
        .iter()
        .map(|recipe| recipe["_id"].as_u64().expect("numeric id"))
        .collect()
}

fn uploaded_files(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn home_lists_one_recipe_per_featured_category() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_many(vec![category("Thai"), category("American"), category("Chinese")])
        .await
        .unwrap();
    store.insert(new_recipe("Thai red chicken soup", "Thai")).await.unwrap();
    store.insert(new_recipe("Crab Cakes", "American")).await.unwrap();
    store.insert(new_recipe("Spring rolls", "Chinese")).await.unwrap();

    let server = TestServer::memory(store).await;
    let (status, page) = server.get("/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["template"], "index");
    assert_eq!(page["categories"].as_array().unwrap().len(), 3);
    assert_eq!(page["food"]["thai"].as_array().unwrap().len(), 1);
    assert_eq!(page["food"]["american"].as_array().unwrap().len(), 1);
    assert_eq!(page["food"]["chinese"].as_array().unwrap().len(), 1);
    assert_eq!(page["food"]["thai"][0]["name"], "Thai red chicken soup");

    let latest = ids(&page["food"]["latest"]);
    assert_eq!(latest.len(), 3);
    assert!(latest.windows(2).all(|pair| pair[0] > pair[1]));
}

#[tokio::test]
async fn home_caps_each_section_at_five() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_many((0..8).map(|i| category(&format!("Cuisine {i}"))).collect())
        .await
        .unwrap();
    for i in 0..8 {
        store.insert(new_recipe(&format!("Curry {i}"), "Thai")).await.unwrap();
    }

    let server = TestServer::memory(store).await;
    let (_, page) = server.get("/").await;

    assert_eq!(page["categories"].as_array().unwrap().len(), 5);
    assert_eq!(page["food"]["thai"].as_array().unwrap().len(), 5);
    assert_eq!(ids(&page["food"]["latest"]), vec![8, 7, 6, 5, 4]);
    assert!(page["food"]["american"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn categories_are_capped_at_twenty() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_many((0..25).map(|i| category(&format!("Cuisine {i}"))).collect())
        .await
        .unwrap();

    let server = TestServer::memory(store).await;
    let (status, page) = server.get("/categories").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["template"], "categories");
    assert_eq!(page["categories"].as_array().unwrap().len(), 20);
    assert_eq!(page["categories"][0]["name"], "Cuisine 0");
}

#[tokio::test]
async fn category_listing_only_returns_that_category() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..25 {
        store.insert(new_recipe(&format!("Curry {i}"), "Thai")).await.unwrap();
    }
    for i in 0..3 {
        store.insert(new_recipe(&format!("Taco {i}"), "Mexican")).await.unwrap();
    }
    store.insert(new_recipe("Orphan", "Martian")).await.unwrap();

    let server = TestServer::memory(store).await;

    let (status, page) = server.get("/categories/Thai").await;
    assert_eq!(status, StatusCode::OK);
    let thai = page["categoryById"].as_array().unwrap();
    assert_eq!(thai.len(), 20);
    assert!(thai.iter().all(|recipe| recipe["category"] == "Thai"));

    let (_, page) = server.get("/categories/Mexican").await;
    assert_eq!(page["categoryById"].as_array().unwrap().len(), 3);

    let (_, page) = server.get("/categories/Martian").await;
    assert_eq!(page["categoryById"][0]["name"], "Orphan");

    let (status, page) = server.get("/categories/Nowhere").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page["categoryById"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn latest_is_newest_first() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..25 {
        store.insert(new_recipe(&format!("Dish {i}"), "Spanish")).await.unwrap();
    }

    let server = TestServer::memory(store).await;
    let (status, page) = server.get("/explore-latest").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["template"], "explore-latest");

    let latest = ids(&page["recipe"]);
    assert_eq!(latest.len(), 20);
    assert_eq!(latest[0], 25);
    assert!(latest.windows(2).all(|pair| pair[0] > pair[1]));
}

#[tokio::test]
async fn recipe_detail() {
    let store = Arc::new(MemoryStore::new());
    let crab = store.insert(new_recipe("Crab Cakes", "American")).await.unwrap();

    let server = TestServer::memory(store).await;

    let (status, page) = server.get(&format!("/recipe/{}", crab.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["template"], "recipe");
    assert_eq!(page["recipe"]["name"], "Crab Cakes");
    assert!(page["recipe"].get("image").is_none());

    let (status, _) = server.get("/recipe/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_recipe_id_is_a_server_error_without_details() {
    let server = TestServer::memory(Arc::new(MemoryStore::new())).await;

    let (status, body) = server.get("/recipe/507f1f77bcf86cd799439011").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Error Occurred");
    assert!(!body.to_string().contains("507f1f77bcf86cd799439011"));
}

#[tokio::test]
async fn random_recipe() {
    let store = Arc::new(MemoryStore::new());
    let server = TestServer::memory(store.clone()).await;

    let (status, _) = server.get("/explore-random").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for name in ["Crab Cakes", "Spring rolls", "Spanish tortilla"] {
        store.insert(new_recipe(name, "Mixed")).await.unwrap();
    }

    for _ in 0..10 {
        let (status, page) = server.get("/explore-random").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["template"], "explore-random");

        let id = page["recipe"]["_id"].as_u64().unwrap();
        assert!((1..=3).contains(&id));
    }
}

#[tokio::test]
async fn search() {
    let store = Arc::new(MemoryStore::new());
    store.insert(new_recipe("Southern fried chicken", "American")).await.unwrap();
    store.insert(new_recipe("Thai red chicken soup", "Thai")).await.unwrap();
    store.insert(new_recipe("Crêpes Suzette", "French")).await.unwrap();

    let server = TestServer::memory(store).await;
    let search = |term: &'static str| {
        server
            .client
            .post(server.url("/search"))
            .form(&[("searchTerm", term)])
            .send()
    };

    let response = search("Chicken").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page: Value = response.json().await.unwrap();
    assert_eq!(page["template"], "search");
    assert_eq!(ids(&page["recipe"]), vec![1, 2]);

    let page: Value = search("chicken -soup").await.unwrap().json().await.unwrap();
    assert_eq!(ids(&page["recipe"]), vec![1]);

    let page: Value = search("crêpes").await.unwrap().json().await.unwrap();
    assert_eq!(ids(&page["recipe"]), vec![3]);

    let response = search("crepes").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page: Value = response.json().await.unwrap();
    assert!(page["recipe"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn submission_form_without_notices() {
    let server = TestServer::memory(Arc::new(MemoryStore::new())).await;

    let (status, page) = server.get("/submit-recipe").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["template"], "submit-recipe");
    assert_eq!(page["infoErrorsObj"], Value::Array(Vec::new()));
    assert_eq!(page["infoSubmitObj"], Value::Array(Vec::new()));
}

#[tokio::test]
async fn submit_without_image() {
    let store = Arc::new(MemoryStore::new());
    let server = TestServer::memory(store.clone()).await;

    let response = server.submit(complete_form()).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/submit-recipe");

    let saved = store.get(RecipeId(1)).await.unwrap().expect("saved recipe");
    assert_eq!(saved.name, "Crab Cakes");
    assert_eq!(saved.category, "American");
    assert_eq!(
        saved.ingredients,
        vec!["750 g cooked crabmeat", "300 g mashed potatoes"]
    );
    assert_eq!(saved.image, None);
    assert!(uploaded_files(&server.uploads).is_empty());

    let (page, cleared) = server.follow(&response).await;
    assert_eq!(page["infoSubmitObj"][0], SUBMITTED_MESSAGE);
    assert!(page["infoErrorsObj"].as_array().unwrap().is_empty());
    assert!(cleared.contains("Max-Age=0"));

    // The notice is gone once read.
    let (_, page) = server.get("/submit-recipe").await;
    assert!(page["infoSubmitObj"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn submit_with_image() {
    let store = Arc::new(MemoryStore::new());
    let server = TestServer::memory(store.clone()).await;

    let form = complete_form().part(
        "image",
        Part::bytes(b"not really a jpeg".to_vec())
            .file_name("crab-cakes.jpg")
            .mime_str("image/jpeg")
            .unwrap(),
    );
    let response = server.submit(form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let saved = store.get(RecipeId(1)).await.unwrap().expect("saved recipe");
    let image = saved.image.expect("image name");

    let timestamp = image.strip_suffix("crab-cakes.jpg").expect("original name kept");
    assert!(!timestamp.is_empty());
    assert!(timestamp.chars().all(|c| c.is_ascii_digit()));

    assert_eq!(uploaded_files(&server.uploads), vec![image.clone()]);
    assert_eq!(
        std::fs::read(server.uploads.join(&image)).unwrap(),
        b"not really a jpeg"
    );
}

#[tokio::test]
async fn submit_with_missing_fields_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let server = TestServer::memory(store.clone()).await;

    let form = Form::new()
        .text("description", "No name, no ingredients.")
        .text("email", "cook@example.com")
        .text("category", "Thai")
        .part(
            "image",
            Part::bytes(b"png".to_vec()).file_name("soup.png"),
        );
    let response = server.submit(form).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(store.count().await.unwrap(), 0);
    assert!(uploaded_files(&server.uploads).is_empty());

    let (page, _) = server.follow(&response).await;
    assert_eq!(
        page["infoErrorsObj"],
        serde_json::json!(["name is required", "at least one ingredient is required"])
    );
    assert!(page["infoSubmitObj"].as_array().unwrap().is_empty());
}

struct RejectingRecipes(MemoryStore);

#[async_trait]
impl RecipeStore for RejectingRecipes {
    async fn by_category(&self, category: &str, limit: usize) -> Result<Vec<Recipe>, StoreError> {
        self.0.by_category(category, limit).await
    }

    async fn latest(&self, limit: usize) -> Result<Vec<Recipe>, StoreError> {
        self.0.latest(limit).await
    }

    async fn get(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        self.0.get(id).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.0.count().await
    }

    async fn nth(&self, offset: u64) -> Result<Option<Recipe>, StoreError> {
        self.0.nth(offset).await
    }

    async fn search(&self, query: &TextQuery) -> Result<Vec<Recipe>, StoreError> {
        self.0.search(query).await
    }

    async fn insert(&self, _recipe: NewRecipe) -> Result<Recipe, StoreError> {
        Err(StoreError::MissingDocument(RecipeId(0)))
    }
}

#[tokio::test]
async fn failed_insert_removes_uploaded_image() {
    let server = TestServer::start(
        Arc::new(MemoryStore::new()),
        Arc::new(RejectingRecipes(MemoryStore::new())),
    )
    .await;

    let form = complete_form().part(
        "image",
        Part::bytes(b"jpeg".to_vec()).file_name("crab-cakes.jpg"),
    );
    let response = server.submit(form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    assert!(uploaded_files(&server.uploads).is_empty());

    let (page, _) = server.follow(&response).await;
    assert_eq!(page["infoErrorsObj"][0], SUBMIT_FAILED_MESSAGE);
    assert!(!page.to_string().contains("indexed but has no document"));
}

#[tokio::test]
async fn store_failures_are_server_errors() {
    let server = TestServer::start(
        Arc::new(MemoryStore::new()),
        Arc::new(BrokenRecipes),
    )
    .await;

    for path in ["/", "/explore-latest", "/explore-random", "/categories/Thai", "/recipe/1"] {
        let (status, body) = server.get(path).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{path}");
        assert_eq!(body["message"], "Error Occurred", "{path}");
    }

    let response = server
        .client
        .post(server.url("/search"))
        .form(&[("searchTerm", "chicken")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "message": "Error Occurred" }));
}

#[tokio::test]
async fn category_store_failures_are_server_errors() {
    let server = TestServer::start(
        Arc::new(BrokenCategories),
        Arc::new(MemoryStore::new()),
    )
    .await;

    for path in ["/", "/categories"] {
        let (status, body) = server.get(path).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{path}");
        assert_eq!(body, serde_json::json!({ "message": "Error Occurred" }), "{path}");
    }
}

#[tokio::test]
async fn failed_image_write_creates_no_recipe() {
    let store = Arc::new(MemoryStore::new());
    let server = TestServer::memory(store.clone()).await;

    // A regular file where the uploads directory should be.
    std::fs::create_dir_all(server.uploads.parent().unwrap()).unwrap();
    std::fs::write(&server.uploads, b"not a directory").unwrap();

    let form = complete_form().part(
        "image",
        Part::bytes(b"jpeg".to_vec()).file_name("crab-cakes.jpg"),
    );
    let response = server.submit(form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(store.count().await.unwrap(), 0);

    let (page, _) = server.follow(&response).await;
    assert_eq!(page["infoErrorsObj"], serde_json::json!([SUBMIT_FAILED_MESSAGE]));
    assert!(page["infoSubmitObj"].as_array().unwrap().is_empty());
}

struct BrokenRecipes;

fn broken() -> StoreError {
    StoreError::MissingDocument(RecipeId(42))
}

#[async_trait]
impl RecipeStore for BrokenRecipes {
    async fn by_category(&self, _: &str, _: usize) -> Result<Vec<Recipe>, StoreError> {
        Err(broken())
    }

    async fn latest(&self, _: usize) -> Result<Vec<Recipe>, StoreError> {
        Err(broken())
    }

    async fn get(&self, _: RecipeId) -> Result<Option<Recipe>, StoreError> {
        Err(broken())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Err(broken())
    }

    async fn nth(&self, _: u64) -> Result<Option<Recipe>, StoreError> {
        Err(broken())
    }

    async fn search(&self, _: &TextQuery) -> Result<Vec<Recipe>, StoreError> {
        Err(broken())
    }

    async fn insert(&self, _: NewRecipe) -> Result<Recipe, StoreError> {
        Err(broken())
    }
}

struct BrokenCategories;

#[async_trait]
impl CategoryStore for BrokenCategories {
    async fn list(&self, _: usize) -> Result<Vec<Category>, StoreError> {
        Err(broken())
    }

    async fn insert_many(&self, _: Vec<Category>) -> Result<(), StoreError> {
        Err(broken())
    }
}
