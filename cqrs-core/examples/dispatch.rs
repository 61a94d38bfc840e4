use async_trait::async_trait;
use cqrs_core::{
    BusError, BusResult, Command, CommandBus, CommandHandler, CqrsRegistry, DispatchContext,
    InProcessCommandBus, InProcessQueryProcessor, Lifetime, Query, QueryHandler, QueryProcessor,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

struct CreateUser {
    name: String,
}
impl Command for CreateUser {
    const NAME: &'static str = "CreateUser";
}

struct UserCount;
impl Query for UserCount {
    const NAME: &'static str = "UserCount";
    type Output = u32;
}

#[derive(Clone, Default)]
struct Users {
    count: Arc<AtomicU32>,
}

struct CreateUserHandler {
    users: Users,
}

#[async_trait]
impl CommandHandler<CreateUser> for CreateUserHandler {
    async fn handle(&self, _ctx: &DispatchContext, cmd: CreateUser) -> BusResult<()> {
        self.users.count.fetch_add(1, Ordering::SeqCst);
        println!("CreateUser: name={}", cmd.name);
        Ok(())
    }
}

struct UserCountHandler {
    users: Users,
}

#[async_trait]
impl QueryHandler<UserCount> for UserCountHandler {
    async fn handle(&self, _ctx: &DispatchContext, _query: UserCount) -> BusResult<u32> {
        Ok(self.users.count.load(Ordering::SeqCst))
    }
}

struct Announcing {
    inner: Arc<dyn CommandHandler<CreateUser>>,
}

#[async_trait]
impl CommandHandler<CreateUser> for Announcing {
    async fn handle(&self, ctx: &DispatchContext, cmd: CreateUser) -> BusResult<()> {
        println!("before {}", CreateUser::NAME);
        self.inner.handle(ctx, cmd).await?;
        println!("after {}", CreateUser::NAME);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let registry = Arc::new(CqrsRegistry::new());
    let users = Users::default();

    let handler_users = users.clone();
    registry.register_command::<CreateUser, _, _>(
        move || CreateUserHandler {
            users: handler_users.clone(),
        },
        Lifetime::Singleton,
    )?;
    let query_users = users.clone();
    registry.register_query::<UserCount, _, _>(
        move || UserCountHandler {
            users: query_users.clone(),
        },
        Lifetime::Singleton,
    )?;
    registry.decorate_command_with::<CreateUser, _, _>(|inner| Announcing { inner })?;

    let bus = InProcessCommandBus::new(registry.clone());
    let processor = InProcessQueryProcessor::new(registry);
    let ctx = DispatchContext::default();

    bus.send(
        &ctx,
        CreateUser {
            name: "Alice".into(),
        },
    )
    .await?;
    println!("users: {}", processor.process(&ctx, UserCount).await?);

    // 未注册的命令 -> HandlerNotFound
    struct UpdateUser;
    impl Command for UpdateUser {
        const NAME: &'static str = "UpdateUser";
    }

    if let Err(BusError::HandlerNotFound(name)) = bus.send(&ctx, UpdateUser).await {
        eprintln!("HandlerNotFound as expected for command: {}", name);
    }
    Ok(())
}
