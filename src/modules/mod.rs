pub mod authors;
pub mod books;
pub mod search;

use shelf_db::SharedStore;
use shelf_kernel::ModuleRegistry;

/// Register every catalog module, all sharing one store handle
pub fn register_all(registry: &mut ModuleRegistry, store: SharedStore) -> anyhow::Result<()> {
    registry.register(authors::create_module(store.clone()))?;
    registry.register(books::create_module(store.clone()))?;
    registry.register(search::create_module(store))?;
    Ok(())
}
