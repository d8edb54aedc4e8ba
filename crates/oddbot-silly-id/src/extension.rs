//! The `SillyID` extension: answers `ckusr` lookups with an embed.

use async_trait::async_trait;
use oddbot_core::extension::{BoxError, DynExtension, Extension, ExtensionDescriptor, ExtensionError};
use oddbot_core::host::{DynNotifier, Embed, HostContext, UserRef};
use oddbot_storage::{MappingBackend, MappingStore};
use parking_lot::Mutex;
use tracing::info;

use crate::allocator::SillyIdAllocator;
use crate::error::{Error, Result};

/// Logical name the extension is registered under.
pub const EXTENSION_NAME: &str = "SillyID";

/// Chat command that looks a user up.
pub const LOOKUP_COMMAND: &str = "ckusr";

/// Field of the lookup embed holding the formatted id.
pub const SILLY_ID_FIELD: &str = "Silly ID";

pub struct SillyIdExtension<B: MappingBackend = MappingStore> {
    name: String,
    /// Allocation and persistence happen under this lock as one step.
    allocator: Mutex<SillyIdAllocator<B>>,
    notifier: DynNotifier,
}

impl SillyIdExtension<MappingStore> {
    /// Open the database configured in `ctx`.
    pub fn open(ctx: &HostContext) -> Result<Self> {
        let store = MappingStore::new(&ctx.config.db_path);
        let allocator = SillyIdAllocator::open(store, ctx.config.gap_size)?;
        Ok(Self::new(allocator, ctx.notifier.clone()))
    }
}

impl<B: MappingBackend> SillyIdExtension<B> {
    pub fn new(allocator: SillyIdAllocator<B>, notifier: DynNotifier) -> Self {
        Self {
            name: EXTENSION_NAME.to_string(),
            allocator: Mutex::new(allocator),
            notifier,
        }
    }

    /// Formatted silly id of `user_id`, assigning one if needed.
    pub fn silly_id(&self, user_id: u64) -> Result<String> {
        let mut allocator = self.allocator.lock();
        let id = allocator.ensure_assigned(user_id)?;
        Ok(allocator.format(id))
    }

    /// Build the lookup embed for `user` and send it to the caller.
    pub async fn check_user(&self, user: &UserRef) -> Result<Embed> {
        let silly_id = self.silly_id(user.id)?;

        let embed = Embed::new("Discord ID")
            .description(user.id.to_string())
            .color(Embed::GREEN)
            .author(user.display_name.clone(), user.avatar_url.clone())
            .field(SILLY_ID_FIELD, silly_id, false);

        self.notifier.send(&embed).await?;
        Ok(embed)
    }

    /// True once the namespace ran out. New users are refused from then on.
    pub fn is_disabled(&self) -> bool {
        self.allocator.lock().is_exhausted()
    }

    pub fn assigned_count(&self) -> usize {
        self.allocator.lock().len()
    }

    /// Write any unsaved assignment.
    pub fn flush(&self) -> Result<()> {
        self.allocator.lock().flush()
    }
}

#[async_trait]
impl<B: MappingBackend + 'static> Extension for SillyIdExtension<B> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_load(&mut self) -> std::result::Result<(), BoxError> {
        info!(category = "silly_id", assigned = self.assigned_count(), "SillyID ready");
        Ok(())
    }

    async fn on_unload(&mut self) -> std::result::Result<(), BoxError> {
        self.flush()?;
        Ok(())
    }

    async fn handle_command(
        &self,
        command: &str,
        args: &[String],
    ) -> oddbot_core::extension::Result<bool> {
        if command != LOOKUP_COMMAND {
            return Ok(false);
        }

        let user = parse_user(args).map_err(|e| self.command_error(e))?;
        match self.check_user(&user).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_exhausted() => Err(ExtensionError::Disabled {
                name: self.name.clone(),
                reason: e.to_string(),
            }),
            Err(e) => Err(self.command_error(e)),
        }
    }
}

impl<B: MappingBackend> SillyIdExtension<B> {
    fn command_error(&self, e: Error) -> ExtensionError {
        ExtensionError::Command {
            name: self.name.clone(),
            source: Box::new(e),
        }
    }
}

/// Parse `ckusr` arguments: a user id or mention, then an optional display name.
pub fn parse_user(args: &[String]) -> Result<UserRef> {
    let raw = args
        .first()
        .ok_or_else(|| Error::InvalidUserId("missing user".to_string()))?;
    let id = parse_user_id(raw)?;

    let display_name = if args.len() > 1 {
        args[1..].join(" ")
    } else {
        format!("user {}", id)
    };
    Ok(UserRef::new(id, display_name))
}

/// Accept `123`, `<@123>` and `<@!123>`.
pub fn parse_user_id(raw: &str) -> Result<u64> {
    let trimmed = raw
        .trim()
        .trim_start_matches("<@")
        .trim_start_matches('!')
        .trim_end_matches('>');
    trimmed
        .parse()
        .map_err(|_| Error::InvalidUserId(raw.to_string()))
}

/// Factory the host registers under [`EXTENSION_NAME`].
pub fn factory(
    ctx: HostContext,
) -> impl Fn(&ExtensionDescriptor) -> std::result::Result<DynExtension, BoxError> + Send + Sync + 'static
{
    move |_descriptor: &ExtensionDescriptor| {
        let ext = SillyIdExtension::open(&ctx)?;
        Ok(Box::new(ext) as DynExtension)
    }
}
