use campus_api_types::{AcademicYear, Blog, Domain, Formation, Mention, Offering, Tag, Writer};
use serde::de::DeserializeOwned;

use crate::client::Resource;
use crate::domain::ListQuery;

use super::HookContext;
use super::hook::ResourceHook;
use super::source::{ItemSource, ListSource};

pub type ListHook<T> = ResourceHook<ListSource<T>>;
pub type ItemHook<T> = ResourceHook<ItemSource<T>>;

pub fn use_list<T>(ctx: &HookContext, resource: Resource, query: ListQuery) -> ListHook<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    ResourceHook::mount(ctx.clone(), ListSource::new(resource), query)
}

pub fn use_item<T>(ctx: &HookContext, resource: Resource, id: impl Into<String>) -> ItemHook<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    ResourceHook::mount(ctx.clone(), ItemSource::new(resource), id.into())
}

pub fn use_blogs(ctx: &HookContext, query: ListQuery) -> ListHook<Blog> {
    use_list(ctx, Resource::Blogs, query)
}

/// Single blog by slug.
pub fn use_blog(ctx: &HookContext, slug: impl Into<String>) -> ItemHook<Blog> {
    use_item(ctx, Resource::Blogs, slug)
}

pub fn use_tags(ctx: &HookContext, query: ListQuery) -> ListHook<Tag> {
    use_list(ctx, Resource::Tags, query)
}

pub fn use_tag(ctx: &HookContext, id: impl Into<String>) -> ItemHook<Tag> {
    use_item(ctx, Resource::Tags, id)
}

pub fn use_writers(ctx: &HookContext, query: ListQuery) -> ListHook<Writer> {
    use_list(ctx, Resource::Writers, query)
}

pub fn use_writer(ctx: &HookContext, id: impl Into<String>) -> ItemHook<Writer> {
    use_item(ctx, Resource::Writers, id)
}

pub fn use_domains(ctx: &HookContext, query: ListQuery) -> ListHook<Domain> {
    use_list(ctx, Resource::Domains, query)
}

pub fn use_domain(ctx: &HookContext, id: impl Into<String>) -> ItemHook<Domain> {
    use_item(ctx, Resource::Domains, id)
}

/// Mentions, optionally narrowed with `query.param("domain_id", ..)`.
pub fn use_mentions(ctx: &HookContext, query: ListQuery) -> ListHook<Mention> {
    use_list(ctx, Resource::Mentions, query)
}

pub fn use_mention(ctx: &HookContext, id: impl Into<String>) -> ItemHook<Mention> {
    use_item(ctx, Resource::Mentions, id)
}

pub fn use_formations(ctx: &HookContext, query: ListQuery) -> ListHook<Formation> {
    use_list(ctx, Resource::Formations, query)
}

pub fn use_formation(ctx: &HookContext, id: impl Into<String>) -> ItemHook<Formation> {
    use_item(ctx, Resource::Formations, id)
}

pub fn use_academic_years(ctx: &HookContext, query: ListQuery) -> ListHook<AcademicYear> {
    use_list(ctx, Resource::AcademicYears, query)
}

pub fn use_academic_year(ctx: &HookContext, id: impl Into<String>) -> ItemHook<AcademicYear> {
    use_item(ctx, Resource::AcademicYears, id)
}

pub fn use_offerings(ctx: &HookContext, query: ListQuery) -> ListHook<Offering> {
    use_list(ctx, Resource::Offerings, query)
}

/// Offering by id; the API embeds its formation and academic year.
pub fn use_offering(ctx: &HookContext, id: impl Into<String>) -> ItemHook<Offering> {
    use_item(ctx, Resource::Offerings, id)
}
