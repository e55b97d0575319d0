use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

const CAPTIONS_FILE: &str = "captions.json";
const USERS_FILE: &str = "users.json";
const FAVORITES_FILE: &str = "favorites.json";

const SEED_CAPTIONS_JSON: &str = include_str!("seed_captions.json");

/// Gradient palette assigned round-robin-by-hash to new captions so
/// text-only cards get a stable background.
const GRADIENTS: [&str; 8] = [
    "from-cyan-400 to-blue-600",
    "from-purple-500 to-pink-500",
    "from-orange-400 to-rose-500",
    "from-indigo-500 via-purple-500 to-indigo-500",
    "from-emerald-400 to-teal-600",
    "from-slate-600 to-slate-800",
    "from-rose-400 to-red-500",
    "from-fuchsia-500 to-cyan-500",
];

use crate::language::Language;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caption {
    pub id: String,
    pub text: String,
    pub language: Language,
    pub category: String,
    pub likes: u64,
    pub gradient: String,
    pub image: Option<String>,
    pub created_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: String,
    pub created_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub user_id: String,
    pub caption_id: String,
    pub created_at: u64,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct CaptionsFile {
    captions: Vec<Caption>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct UsersFile {
    users: Vec<User>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct FavoritesFile {
    favorites: Vec<Favorite>,
}

/// Fields of a caption submission; everything else is assigned on insert.
#[derive(Debug, Clone)]
pub struct NewCaption {
    pub text: String,
    pub language: Language,
    pub category: Option<String>,
    pub image: Option<String>,
}

/// JSON-file-backed persistence for the three collections. Each operation
/// reads the collection, mutates it, and writes it back atomically; callers
/// serialize concurrent access.
pub struct Store {
    dir: PathBuf,
}

impl Store {
    /// Open (or create) a store directory. An empty caption collection is
    /// seeded with the starter dataset.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create store directory: {}", dir.display()))?;
        let store = Self { dir };
        if !store.path(CAPTIONS_FILE).exists() {
            let seed: CaptionsFile = serde_json::from_str(SEED_CAPTIONS_JSON)
                .with_context(|| "failed to parse seed captions")?;
            store.write_collection(CAPTIONS_FILE, &seed)?;
        }
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Captions in `language`, newest first, optionally narrowed by a
    /// case-insensitive search over text or category.
    pub fn list_captions(&self, language: Language, search: Option<&str>) -> Result<Vec<Caption>> {
        let mut captions = self.read_captions()?;
        captions.retain(|caption| caption.language == language);
        if let Some(query) = search.map(str::trim).filter(|query| !query.is_empty()) {
            let needle = query.to_lowercase();
            captions.retain(|caption| {
                caption.text.to_lowercase().contains(&needle)
                    || caption.category.to_lowercase().contains(&needle)
            });
        }
        sort_newest_first(&mut captions);
        Ok(captions)
    }

    pub fn insert_caption(&self, new: NewCaption) -> Result<Caption> {
        let text = new.text.trim().to_string();
        if text.is_empty() {
            return Err(anyhow!("caption text is empty"));
        }
        let created_at = now_unix();
        let id = new_record_id(&format!("caption:{}:{}", created_at, text));
        let caption = Caption {
            gradient: gradient_for(&id).to_string(),
            id,
            text,
            language: new.language,
            category: new
                .category
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| "General".to_string()),
            likes: 0,
            image: new.image,
            created_at,
        };
        let mut file = self.read_collection::<CaptionsFile>(CAPTIONS_FILE)?;
        file.captions.push(caption.clone());
        self.write_collection(CAPTIONS_FILE, &file)?;
        tracing::info!(id = %caption.id, has_image = caption.image.is_some(), "caption stored");
        Ok(caption)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.read_collection::<UsersFile>(USERS_FILE)?.users)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.list_users()?;
        Ok(users
            .into_iter()
            .find(|user| user.email.eq_ignore_ascii_case(email)))
    }

    /// Insert a new account. Email uniqueness is the caller's precondition;
    /// it is re-checked here to keep the collection consistent.
    pub fn create_user(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let mut file = self.read_collection::<UsersFile>(USERS_FILE)?;
        if file
            .users
            .iter()
            .any(|user| user.email.eq_ignore_ascii_case(email))
        {
            return Err(anyhow!("email already exists"));
        }
        let created_at = now_unix();
        let user = User {
            id: new_record_id(&format!("user:{}:{}", created_at, email)),
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
            avatar: avatar_url(name),
            created_at,
        };
        file.users.push(user.clone());
        self.write_collection(USERS_FILE, &file)?;
        tracing::info!(id = %user.id, email = %user.email, "user created");
        Ok(user)
    }

    /// Flip the favorite state for a (user, caption) pair. Returns the state
    /// after the toggle; the unique-pair invariant holds because an existing
    /// entry is removed rather than duplicated.
    pub fn toggle_favorite(&self, user_id: &str, caption_id: &str) -> Result<bool> {
        let mut file = self.read_collection::<FavoritesFile>(FAVORITES_FILE)?;
        let before = file.favorites.len();
        file.favorites
            .retain(|fav| !(fav.user_id == user_id && fav.caption_id == caption_id));
        let favorited = if file.favorites.len() == before {
            file.favorites.push(Favorite {
                user_id: user_id.to_string(),
                caption_id: caption_id.to_string(),
                created_at: now_unix(),
            });
            true
        } else {
            false
        };
        self.write_collection(FAVORITES_FILE, &file)?;
        Ok(favorited)
    }

    /// Captions a user favorited, newest caption first. Favorites pointing
    /// at deleted captions are skipped.
    pub fn favorites_for_user(&self, user_id: &str) -> Result<Vec<Caption>> {
        let file = self.read_collection::<FavoritesFile>(FAVORITES_FILE)?;
        let captions = self.read_captions()?;
        let by_id: HashMap<&str, &Caption> = captions
            .iter()
            .map(|caption| (caption.id.as_str(), caption))
            .collect();
        let mut favorited: Vec<Caption> = file
            .favorites
            .iter()
            .filter(|fav| fav.user_id == user_id)
            .filter_map(|fav| by_id.get(fav.caption_id.as_str()).map(|&c| c.clone()))
            .collect();
        sort_newest_first(&mut favorited);
        Ok(favorited)
    }

    /// Which of `caption_ids` the user has favorited.
    pub fn favorite_map(&self, user_id: &str, caption_ids: &[&str]) -> Result<HashMap<String, bool>> {
        let file = self.read_collection::<FavoritesFile>(FAVORITES_FILE)?;
        let mut map = HashMap::new();
        for fav in file.favorites.iter().filter(|fav| fav.user_id == user_id) {
            if caption_ids.contains(&fav.caption_id.as_str()) {
                map.insert(fav.caption_id.clone(), true);
            }
        }
        Ok(map)
    }

    fn read_captions(&self) -> Result<Vec<Caption>> {
        Ok(self.read_collection::<CaptionsFile>(CAPTIONS_FILE)?.captions)
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn read_collection<T: Default + for<'de> Deserialize<'de>>(&self, name: &str) -> Result<T> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(T::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read store file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse store file: {}", path.display()))
    }

    fn write_collection<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.path(name);
        let content = serde_json::to_string_pretty(value)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".capshala-")
            .tempfile_in(&self.dir)
            .with_context(|| format!("failed to create temp file in {}", self.dir.display()))?;
        tmp.write_all(content.as_bytes())
            .with_context(|| "failed to write store temp file")?;
        tmp.persist(&path)
            .with_context(|| format!("failed to persist store file: {}", path.display()))?;
        Ok(())
    }
}

fn sort_newest_first(captions: &mut [Caption]) {
    captions.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

fn new_record_id(seed: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or(0);
    format!("{:x}", md5::compute(format!("{}:{}", seed, nanos).as_bytes()))
}

fn gradient_for(id: &str) -> &'static str {
    let digest = md5::compute(id.as_bytes());
    GRADIENTS[digest[0] as usize % GRADIENTS.len()]
}

fn avatar_url(name: &str) -> String {
    let encoded = name.trim().replace(' ', "+");
    format!(
        "https://ui-avatars.com/api/?name={}&background=random",
        encoded
    )
}
