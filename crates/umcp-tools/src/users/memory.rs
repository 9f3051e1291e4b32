//! In-process user service with seeded demo data.

use std::collections::BTreeMap;

use tokio::sync::Mutex;
use umcp_types::ToolError;

use super::{NewUser, ServiceFuture, User, UserSearch, UserService, UserUpdate};

#[derive(Debug)]
struct Inner {
    users: BTreeMap<u64, User>,
    next_id: u64,
}

/// [`UserService`] that keeps users in memory. Backs `--in-memory` mode and tests.
#[derive(Debug)]
pub struct InMemoryUserService {
    inner: Mutex<Inner>,
}

impl InMemoryUserService {
    /// An empty service.
    pub fn new() -> Self {
        Self::with_users(Vec::new())
    }

    /// A service holding `users`. New ids continue after the largest one.
    pub fn with_users(users: Vec<User>) -> Self {
        let next_id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let users = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            inner: Mutex::new(Inner { users, next_id }),
        }
    }

    /// A service seeded with a few demo users, ids starting at 1.
    pub fn seeded() -> Self {
        Self::with_users(demo_users())
    }
}

impl Default for InMemoryUserService {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(id: u64) -> ToolError {
    ToolError::Service {
        status: 404,
        message: format!("User with id {id} not found"),
    }
}

fn contains_ci(field: &str, needle: &Option<String>) -> bool {
    needle
        .as_deref()
        .is_none_or(|n| field.to_lowercase().contains(&n.to_lowercase()))
}

impl UserService for InMemoryUserService {
    fn get_user(&self, id: u64) -> ServiceFuture<'_, User> {
        Box::pin(async move {
            let inner = self.inner.lock().await;
            inner.users.get(&id).cloned().ok_or_else(|| not_found(id))
        })
    }

    fn search_users(&self, filter: UserSearch) -> ServiceFuture<'_, Vec<User>> {
        Box::pin(async move {
            let inner = self.inner.lock().await;
            let found = inner
                .users
                .values()
                .filter(|u| {
                    contains_ci(&u.name, &filter.name)
                        && contains_ci(&u.surname, &filter.surname)
                        && contains_ci(&u.email, &filter.email)
                        && filter.gender.as_deref().is_none_or(|g| {
                            u.gender.as_deref().is_some_and(|ug| ug.eq_ignore_ascii_case(g))
                        })
                })
                .cloned()
                .collect();
            Ok(found)
        })
    }

    fn add_user(&self, user: NewUser) -> ServiceFuture<'_, User> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            if inner.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
                return Err(ToolError::Service {
                    status: 409,
                    message: format!("User with email {} already exists", user.email),
                });
            }
            let id = inner.next_id;
            inner.next_id += 1;
            let created = User {
                id,
                name: user.name,
                surname: user.surname,
                email: user.email,
                phone: user.phone,
                date_of_birth: user.date_of_birth,
                gender: user.gender,
                company: user.company,
                salary: user.salary,
                about_me: user.about_me,
            };
            inner.users.insert(id, created.clone());
            tracing::debug!(id, "User added");
            Ok(created)
        })
    }

    fn update_user(&self, id: u64, update: UserUpdate) -> ServiceFuture<'_, User> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            let user = inner.users.get_mut(&id).ok_or_else(|| not_found(id))?;
            if let Some(v) = update.name {
                user.name = v;
            }
            if let Some(v) = update.surname {
                user.surname = v;
            }
            if let Some(v) = update.email {
                user.email = v;
            }
            user.phone = update.phone.or(user.phone.take());
            user.date_of_birth = update.date_of_birth.or(user.date_of_birth.take());
            user.gender = update.gender.or(user.gender.take());
            user.company = update.company.or(user.company.take());
            user.salary = update.salary.or(user.salary);
            user.about_me = update.about_me.or(user.about_me.take());
            Ok(user.clone())
        })
    }

    fn delete_user(&self, id: u64) -> ServiceFuture<'_, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            inner.users.remove(&id).map(|_| ()).ok_or_else(|| not_found(id))
        })
    }
}

fn demo_users() -> Vec<User> {
    let user = |id, name: &str, surname: &str, gender: &str, company: &str, salary| User {
        id,
        name: name.to_string(),
        surname: surname.to_string(),
        email: format!("{}.{}@example.com", name.to_lowercase(), surname.to_lowercase()),
        phone: None,
        date_of_birth: None,
        gender: Some(gender.to_string()),
        company: Some(company.to_string()),
        salary: Some(salary),
        about_me: None,
    };
    vec![
        user(1, "Ava", "Thompson", "female", "Northwind", 85000.0),
        user(2, "Liam", "Carter", "male", "Contoso", 72000.0),
        user(3, "Mia", "Alvarez", "female", "Fabrikam", 91000.0),
        user(4, "Noah", "Bennett", "male", "Northwind", 64000.0),
        user(5, "Emma", "Carter", "female", "Initech", 78000.0),
    ]
}
