//! Ordered construction of a container from a template.
//!
//! Stages run services, devices, network, branches, objective. Services come
//! first so the reserve terms they write into device range expressions exist
//! when the device builders turn those expressions into constraints. Each
//! stage function can also be called on its own; the container rejects going
//! back to an earlier stage.

use pcm_core::DataSource;
use tracing::info;

use crate::container::{BuildStage, ObjectiveSense, ProblemContainer};
use crate::error::BuildResult;
use crate::formulations::network;
use crate::registry::{BranchContext, BuilderRegistry, DeviceContext, ServiceContext};
use crate::settings::ProblemSettings;
use crate::template::ProblemTemplate;

/// Borrowed inputs of one build pass.
pub struct ConstructionPipeline<'a> {
    template: &'a ProblemTemplate,
    registry: &'a BuilderRegistry,
    source: &'a dyn DataSource,
}

impl<'a> ConstructionPipeline<'a> {
    pub fn new(
        template: &'a ProblemTemplate,
        registry: &'a BuilderRegistry,
        source: &'a dyn DataSource,
    ) -> Self {
        Self {
            template,
            registry,
            source,
        }
    }

    /// Run every stage on a fresh container.
    pub fn build(&self, settings: &ProblemSettings) -> BuildResult<ProblemContainer> {
        let mut container = ProblemContainer::new(settings, self.template.network(), self.source)?;
        self.construct_services(&mut container)?;
        self.construct_devices(&mut container)?;
        self.construct_network(&mut container)?;
        self.construct_branches(&mut container)?;
        self.finalize_objective(&mut container)?;
        Ok(container)
    }

    pub fn construct_services(&self, container: &mut ProblemContainer) -> BuildResult<()> {
        container.enter_stage(BuildStage::Services)?;
        for (name, model) in self.template.services() {
            let builder = self.registry.service(model)?;
            let ctx = ServiceContext {
                name,
                model,
                template: self.template,
                source: self.source,
            };
            builder(container, &ctx)?;
        }
        Ok(())
    }

    /// Device models in template order.
    pub fn construct_devices(&self, container: &mut ProblemContainer) -> BuildResult<()> {
        container.enter_stage(BuildStage::Devices)?;
        let network = container.network();
        for (name, model) in self.template.devices() {
            let builder = self.registry.device(model, network)?;
            let ctx = DeviceContext {
                name,
                model,
                source: self.source,
            };
            builder(container, &ctx)?;
        }
        Ok(())
    }

    pub fn construct_network(&self, container: &mut ProblemContainer) -> BuildResult<()> {
        container.enter_stage(BuildStage::Network)?;
        network::construct_network(container, self.source)
    }

    pub fn construct_branches(&self, container: &mut ProblemContainer) -> BuildResult<()> {
        container.enter_stage(BuildStage::Branches)?;
        let network = container.network();
        for (name, model) in self.template.branches() {
            let builder = self.registry.branch(model, network)?;
            let ctx = BranchContext {
                name,
                model,
                source: self.source,
            };
            builder(container, &ctx)?;
        }
        Ok(())
    }

    pub fn finalize_objective(&self, container: &mut ProblemContainer) -> BuildResult<()> {
        container.enter_stage(BuildStage::Objective)?;
        container.set_objective_sense(ObjectiveSense::Minimize);
        info!(
            problem = %container.settings().problem_name,
            variables = container.num_variables(),
            constraints = container.num_constraints(),
            parameters = container.parameters().values().len(),
            "problem built"
        );
        Ok(())
    }
}
